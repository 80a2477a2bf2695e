//! Configuration for the emsmon CLI.
//!
//! TOML profiles, token resolution (env var, keyring, plaintext), and
//! translation to `emsmon_core::SessionConfig`. Core never reads files;
//! this crate is the only place that does.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use emsmon_core::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECONNECT_DELAY, DEFAULT_RTV_PERIOD_SECS, Endpoint,
    SessionConfig,
};

/// Keyring service name; entries are keyed `<profile>/token`.
pub const KEYRING_SERVICE: &str = "emsmon";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named endpoint profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use, honouring an explicit choice first.
    pub fn profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Pause before reconnecting, in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Period requested in rtv subscriptions, in seconds.
    #[serde(default = "default_rtv_period")]
    pub rtv_period: u32,

    /// Handshake timeout, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            rtv_period: default_rtv_period(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_reconnect_delay_ms() -> u64 {
    u64::try_from(DEFAULT_RECONNECT_DELAY.as_millis()).unwrap_or(3_000)
}
fn default_rtv_period() -> u32 {
    DEFAULT_RTV_PERIOD_SECS
}
fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

/// A named telemetry endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// WebSocket base URL (e.g. "ws://ems.example.net:8888/").
    pub endpoint: String,

    /// Authorization token appended to the endpoint path (plaintext;
    /// prefer the keyring or `token_env`).
    pub token: Option<String>,

    /// Environment variable holding the token.
    pub token_env: Option<String>,

    /// Override the `User-Agent` sent on upgrade.
    pub user_agent: Option<String>,

    /// Override the `Origin` sent on upgrade.
    pub origin: Option<String>,

    pub reconnect_delay_ms: Option<u64>,
    pub rtv_period: Option<u32>,
    pub connect_timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "emsmon", "emsmon").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("emsmon");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path, with `EMSMON_` env overrides
/// (nested keys separated by `__`, e.g. `EMSMON_DEFAULTS__OUTPUT`).
/// A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("EMSMON_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if anything goes wrong.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
}

/// Resolve the token from the credential chain: `token_env` variable,
/// then the system keyring, then the plaintext `token` field.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
        tracing::debug!(env = %env_name, "token_env variable not set");
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a token for `profile_name` in the system keyring.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Parse and validate a `ws://` / `wss://` base URL.
pub fn parse_endpoint_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "endpoint".into(),
        reason: format!("invalid URL: {raw}"),
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConfigError::Validation {
            field: "endpoint".into(),
            reason: format!("expected a ws:// or wss:// URL, got scheme '{other}'"),
        }),
    }
}

/// Build a `SessionConfig` from a profile and an already resolved token.
pub fn session_config_with_token(
    profile: &Profile,
    defaults: &Defaults,
    token: SecretString,
) -> Result<SessionConfig, ConfigError> {
    let base = parse_endpoint_url(&profile.endpoint)?;

    let mut endpoint = Endpoint::new(base, token);
    if let Some(ref user_agent) = profile.user_agent {
        endpoint = endpoint.with_user_agent(user_agent.clone());
    }
    if let Some(ref origin) = profile.origin {
        endpoint = endpoint.with_origin(origin.clone());
    }

    let rtv_period = profile.rtv_period.unwrap_or(defaults.rtv_period);
    if rtv_period == 0 {
        return Err(ConfigError::Validation {
            field: "rtv_period".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    Ok(SessionConfig::new(endpoint)
        .with_reconnect_delay(Duration::from_millis(
            profile
                .reconnect_delay_ms
                .unwrap_or(defaults.reconnect_delay_ms),
        ))
        .with_rtv_period(rtv_period)
        .with_connect_timeout(Duration::from_secs(
            profile.connect_timeout.unwrap_or(defaults.connect_timeout),
        )))
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.defaults.reconnect_delay_ms, 3_000);
        assert_eq!(cfg.defaults.rtv_period, 5);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn profiles_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
default_profile = "site-a"

[defaults]
output = "json"

[profiles.site-a]
endpoint = "ws://ems.example.net:8888/"
token = "E6F7D5412A20?abc"
origin = "http://ems.example.net:8114"
reconnect_delay_ms = 500
"#,
        );

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.profile_name(None), "site-a");
        assert_eq!(cfg.profile_name(Some("other")), "other");
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.color, "auto");

        let profile = &cfg.profiles["site-a"];
        assert_eq!(profile.token.as_deref(), Some("E6F7D5412A20?abc"));
        assert_eq!(profile.reconnect_delay_ms, Some(500));
    }

    #[test]
    fn session_config_applies_overrides() {
        let profile = Profile {
            endpoint: "ws://ems.example.net:8888/".into(),
            origin: Some("http://ems.example.net:8114".into()),
            user_agent: Some("emsmon-test/1".into()),
            rtv_period: Some(10),
            ..Profile::default()
        };

        let cfg = session_config_with_token(
            &profile,
            &Defaults::default(),
            SecretString::from("E6F7D5412A20?abc".to_owned()),
        )
        .unwrap();

        assert_eq!(cfg.rtv_period_secs, 10);
        assert_eq!(cfg.reconnect_delay, Duration::from_secs(3));
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
        assert_eq!(cfg.endpoint.origin(), "http://ems.example.net:8114");
        assert_eq!(cfg.endpoint.user_agent(), "emsmon-test/1");
        assert_eq!(
            cfg.endpoint.target().unwrap().as_str(),
            "ws://ems.example.net:8888/E6F7D5412A20?abc"
        );
    }

    #[test]
    fn plaintext_token_is_last_resort() {
        let profile = Profile {
            endpoint: "ws://127.0.0.1:8888/".into(),
            token: Some("plain".into()),
            token_env: Some("EMSMON_TEST_TOKEN_THAT_IS_NEVER_SET".into()),
            ..Profile::default()
        };

        let token = resolve_token(&profile, "emsmon-test-plaintext").unwrap();
        let cfg = session_config_with_token(&profile, &Defaults::default(), token).unwrap();
        assert_eq!(cfg.endpoint.target().unwrap().as_str(), "ws://127.0.0.1:8888/plain");
    }

    #[test]
    fn missing_token_is_no_credentials() {
        let profile = Profile {
            endpoint: "ws://127.0.0.1:8888/".into(),
            ..Profile::default()
        };

        let err = resolve_token(&profile, "emsmon-test-no-token").unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { ref profile } if profile == "emsmon-test-no-token"));
    }

    #[test]
    fn http_endpoint_is_rejected() {
        let err = parse_endpoint_url("http://ems.example.net:8888/").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "endpoint"));

        assert!(parse_endpoint_url("not a url").is_err());
        assert!(parse_endpoint_url("wss://ems.example.net/").is_ok());
    }

    #[test]
    fn zero_rtv_period_is_rejected() {
        let profile = Profile {
            endpoint: "ws://127.0.0.1:8888/".into(),
            rtv_period: Some(0),
            ..Profile::default()
        };
        let err = session_config_with_token(
            &profile,
            &Defaults::default(),
            SecretString::from("t".to_owned()),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "rtv_period"));
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert(
            "plant".into(),
            Profile {
                endpoint: "wss://ems.example.net/ws/".into(),
                token_env: Some("PLANT_TOKEN".into()),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles["plant"].endpoint, "wss://ems.example.net/ws/");
        assert_eq!(loaded.profiles["plant"].token_env.as_deref(), Some("PLANT_TOKEN"));
    }
}
