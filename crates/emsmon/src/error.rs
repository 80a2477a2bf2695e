//! CLI error types with miette diagnostics.
//!
//! Maps config and core errors into user-facing errors with actionable
//! help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use emsmon_config::ConfigError;
use emsmon_core::CoreError;

/// Process exit codes.
#[allow(dead_code)]
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("No {what} received from {url} within {seconds}s")]
    #[diagnostic(
        code(emsmon::nothing_received),
        help(
            "The session kept retrying in the background.\n\
             Increase --wait, or run with -v to see connection errors."
        )
    )]
    NothingReceived {
        what: &'static str,
        url: String,
        seconds: u64,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No token configured for profile '{profile}'")]
    #[diagnostic(
        code(emsmon::no_credentials),
        help(
            "Store one with: emsmon --profile {profile} config set-token\n\
             Or pass --token / set EMSMON_TOKEN."
        )
    )]
    NoCredentials { profile: String },

    #[error("No endpoint configured")]
    #[diagnostic(
        code(emsmon::no_config),
        help(
            "Pass --endpoint ws://host:port/ or add a profile to the config file.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(code(emsmon::profile_not_found), help("Available profiles: {available}"))]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(emsmon::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {reason}")]
    #[diagnostic(code(emsmon::keyring))]
    Keyring { reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(emsmon::validation))]
    Validation { field: String, reason: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(emsmon::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(emsmon::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(emsmon::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NothingReceived { .. } => exit_code::CONNECTION,
            Self::NoCredentials { .. }
            | Self::NoConfig { .. }
            | Self::ProfileNotFound { .. }
            | Self::Config(_)
            | Self::Keyring { .. } => exit_code::CONFIG,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            },
            ConfigError::Keyring(e) => CliError::Keyring {
                reason: e.to_string(),
            },
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AlreadyRunning => CliError::Internal(err.to_string()),
        }
    }
}
