//! CLI flag overrides on top of `emsmon_config`.
//!
//! Core never sees any of this: it receives a pre-built `SessionConfig`.

use clap::ValueEnum;
use secrecy::SecretString;

use emsmon_config::{Config, Defaults, Profile};
use emsmon_core::SessionConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Settle `output` and `color`: an explicit flag (or `EMSMON_OUTPUT`)
/// wins, then the config file's `[defaults]`.
pub fn apply_display_defaults(global: &mut GlobalOpts, defaults: &Defaults) -> Result<(), CliError> {
    global.output = match global.output_flag {
        Some(format) => format,
        None => parse_default("defaults.output", &defaults.output)?,
    };
    global.color = match global.color_flag {
        Some(mode) => mode,
        None => parse_default("defaults.color", &defaults.color)?,
    };
    Ok(())
}

fn parse_default<T: ValueEnum>(field: &str, raw: &str) -> Result<T, CliError> {
    T::from_str(raw, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

/// Profile name selected by `--profile`, else the config default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    cfg.profile_name(global.profile.as_deref())
}

/// Comma-separated profile names for diagnostics.
pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}

/// Build a `SessionConfig` from the config file, profile, and CLI overrides.
///
/// `--endpoint` and `--token` win over the profile. Without a matching
/// profile, `--endpoint` alone is enough as long as a token is given too.
pub fn build_session_config(global: &GlobalOpts, cfg: &Config) -> Result<SessionConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => {
            let mut profile = profile.clone();
            if let Some(ref endpoint) = global.endpoint {
                profile.endpoint.clone_from(endpoint);
            }
            profile
        }
        None => {
            // An explicit --profile that does not exist is a mistake,
            // the implicit default missing is not.
            if global.profile.is_some() && global.endpoint.is_none() {
                return Err(CliError::ProfileNotFound {
                    name: profile_name,
                    available: available_profiles(cfg),
                });
            }
            let endpoint = global.endpoint.clone().ok_or_else(|| CliError::NoConfig {
                path: emsmon_config::config_path().display().to_string(),
            })?;
            Profile {
                endpoint,
                ..Profile::default()
            }
        }
    };

    let token = match global.token {
        Some(ref token) => SecretString::from(token.clone()),
        None => emsmon_config::resolve_token(&profile, &profile_name)?,
    };

    Ok(emsmon_config::session_config_with_token(
        &profile,
        &cfg.defaults,
        token,
    )?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::{Cli, ColorMode, OutputFormat};
    use clap::Parser;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["emsmon"];
        argv.extend_from_slice(args);
        argv.push("tree");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with_site() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "site".into(),
            Profile {
                endpoint: "ws://ems.example.net:8888/".into(),
                token: Some("E6F7D5412A20?abc".into()),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn flags_alone_are_enough() {
        let g = global(&["--endpoint", "ws://10.0.0.5:8888/", "--token", "T?1"]);
        let session = build_session_config(&g, &Config::default()).unwrap();
        assert_eq!(
            session.endpoint.target().unwrap().as_str(),
            "ws://10.0.0.5:8888/T?1"
        );
    }

    #[test]
    fn profile_with_flag_override() {
        let g = global(&["-p", "site", "--token", "other"]);
        let session = build_session_config(&g, &config_with_site()).unwrap();
        assert_eq!(
            session.endpoint.target().unwrap().as_str(),
            "ws://ems.example.net:8888/other"
        );
    }

    #[test]
    fn unknown_profile_is_reported() {
        let g = global(&["-p", "nope"]);
        let err = build_session_config(&g, &config_with_site()).unwrap_err();
        assert!(matches!(err, CliError::ProfileNotFound { ref available, .. } if available == "site"));
    }

    #[test]
    fn config_defaults_apply_without_flags() {
        let mut cfg = Config::default();
        cfg.defaults.output = "json-compact".into();
        cfg.defaults.color = "never".into();

        let mut g = global(&[]);
        apply_display_defaults(&mut g, &cfg.defaults).unwrap();
        assert_eq!(g.output, OutputFormat::JsonCompact);
        assert_eq!(g.color, ColorMode::Never);
    }

    #[test]
    fn flags_beat_config_defaults() {
        let mut cfg = Config::default();
        cfg.defaults.output = "yaml".into();

        let mut g = global(&["-o", "plain", "--color", "always"]);
        apply_display_defaults(&mut g, &cfg.defaults).unwrap();
        assert_eq!(g.output, OutputFormat::Plain);
        assert_eq!(g.color, ColorMode::Always);
    }

    #[test]
    fn bad_config_default_is_reported() {
        let mut cfg = Config::default();
        cfg.defaults.output = "html".into();

        let mut g = global(&[]);
        let err = apply_display_defaults(&mut g, &cfg.defaults).unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "defaults.output"));
    }

    #[test]
    fn nothing_configured_is_no_config() {
        let g = global(&[]);
        let err = build_session_config(&g, &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::NoConfig { .. }));
    }
}
