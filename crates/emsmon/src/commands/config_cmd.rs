//! Config subcommand handlers.

use std::io::BufRead;

use serde::Serialize;

use emsmon_config::Profile;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Resolved profile as shown by `config show`. Never carries the token.
#[derive(Debug, Serialize)]
struct ProfileView {
    profile: String,
    endpoint: String,
    token_source: &'static str,
    user_agent: String,
    origin: String,
    reconnect_delay_ms: u64,
    rtv_period: u32,
    connect_timeout: u64,
}

impl ProfileView {
    fn detail(&self) -> String {
        format!(
            "Profile:          {}\n\
             Endpoint:         {}\n\
             Token:            <redacted> ({})\n\
             User-Agent:       {}\n\
             Origin:           {}\n\
             Reconnect delay:  {} ms\n\
             Rtv period:       {} s\n\
             Connect timeout:  {} s",
            self.profile,
            self.endpoint,
            self.token_source,
            self.user_agent,
            self.origin,
            self.reconnect_delay_ms,
            self.rtv_period,
            self.connect_timeout,
        )
    }
}

pub fn handle(args: ConfigArgs, mut global: GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(
                &emsmon_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = emsmon_config::load_config()?;
            config::apply_display_defaults(&mut global, &cfg.defaults)?;
            let profile_name = config::active_profile_name(&global, &cfg);
            let session = config::build_session_config(&global, &cfg)?;

            let token_env = cfg
                .profiles
                .get(&profile_name)
                .and_then(|p| p.token_env.as_deref());
            let token_source = if global.token.is_some() {
                "--token / EMSMON_TOKEN"
            } else if token_env.is_some_and(|name| std::env::var_os(name).is_some()) {
                "environment"
            } else {
                "keyring or config file"
            };

            let view = ProfileView {
                profile: profile_name,
                endpoint: session.endpoint.base().to_string(),
                token_source,
                user_agent: session.endpoint.user_agent().to_owned(),
                origin: session.endpoint.origin().to_owned(),
                reconnect_delay_ms: u64::try_from(session.reconnect_delay.as_millis())
                    .unwrap_or(u64::MAX),
                rtv_period: session.rtv_period_secs,
                connect_timeout: session.connect_timeout.as_secs(),
            };

            let out = output::render_single(
                global.output,
                &view,
                ProfileView::detail,
                |v| v.endpoint.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = emsmon_config::load_config()?;
            let profile_name = config::active_profile_name(&global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            set_profile_key(profile, &key, value)?;

            emsmon_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        // ── Use <name> ──────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = emsmon_config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            emsmon_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }

        // ── SetToken ────────────────────────────────────────────────
        ConfigCommand::SetToken { token } => {
            let cfg = emsmon_config::load_config_or_default();
            let profile_name = config::active_profile_name(&global, &cfg);

            let token = match token {
                Some(token) => token,
                None => {
                    let mut line = String::new();
                    std::io::stdin().lock().read_line(&mut line)?;
                    line.trim().to_owned()
                }
            };

            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            emsmon_config::store_token(&profile_name, &token)?;
            if !global.quiet {
                eprintln!("✓ Token stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }
    }
}

/// Assign one profile field from its textual value.
fn set_profile_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    fn number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, CliError> {
        value.parse().map_err(|_| CliError::Validation {
            field: field.into(),
            reason: format!("expected a non-negative integer, got '{value}'"),
        })
    }

    match key {
        "endpoint" => {
            emsmon_config::parse_endpoint_url(&value)?;
            profile.endpoint = value;
        }
        "token_env" | "token-env" => profile.token_env = Some(value),
        "user_agent" | "user-agent" => profile.user_agent = Some(value),
        "origin" => profile.origin = Some(value),
        "reconnect_delay_ms" | "reconnect-delay-ms" => {
            profile.reconnect_delay_ms = Some(number("reconnect_delay_ms", &value)?);
        }
        "rtv_period" | "rtv-period" => {
            let period: u32 = number("rtv_period", &value)?;
            if period == 0 {
                return Err(CliError::Validation {
                    field: "rtv_period".into(),
                    reason: "must be at least 1 second".into(),
                });
            }
            profile.rtv_period = Some(period);
        }
        "connect_timeout" | "connect-timeout" => {
            profile.connect_timeout = Some(number("connect_timeout", &value)?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: endpoint, token_env, \
                     user_agent, origin, reconnect_delay_ms, rtv_period, connect_timeout"
                ),
            });
        }
    }
    Ok(())
}
