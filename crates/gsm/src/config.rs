//! CLI-specific configuration: flag overrides on top of `gsm_config`.
//!
//! Profiles, credential resolution and file loading live in the shared
//! config crate. This module layers `--address`, `--port`, `--password` and
//! `--timeout` on top and decides which server a command talks to.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use gsm_config::{Config, ResolvedProfile};
use gsm_core::savedata::DEFAULT_PROFILE_EXTENSION;
use gsm_core::{ConnectionParameters, RosterConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use gsm_config::config_path;

const DEFAULT_RCON_PORT: u16 = 27020;

/// The server a command runs against.
#[derive(Debug)]
pub struct Target {
    pub profile: ResolvedProfile,
    /// The config file the profile came from, when no flag pins the
    /// connection. Long-running commands follow edits to it.
    pub watch_path: Option<PathBuf>,
}

/// Load the config file named by `GSM_CONFIG` or the platform default.
pub fn load() -> Result<Config, CliError> {
    Ok(gsm_config::load_config()?)
}

/// Resolve the target server from the config file, profile, and flags.
pub fn resolve_target(global: &GlobalOpts) -> Result<Target, CliError> {
    let path = config_path();
    let cfg = gsm_config::load_config_from(&path)?;
    let name = cfg.active_profile_name(global.profile.as_deref());
    let flag_password = global.password.clone().map(SecretString::from);

    // A configured profile, with flag overrides on top
    if cfg.profiles.contains_key(&name) {
        let mut profile = gsm_config::resolve_profile(&cfg, &name, flag_password)?;
        apply_overrides(&mut profile, global)?;
        let watch_path = (!global.overrides_connection()).then_some(path);
        return Ok(Target {
            profile,
            watch_path,
        });
    }

    // An explicitly named profile that doesn't exist is an error, not a
    // cue to fall back to flags.
    if global.profile.is_some() && global.address.is_none() {
        return Err(CliError::ProfileNotFound {
            name,
            available: available_profiles(&cfg),
        });
    }

    // No profile -- build from flags / env vars alone
    let address = global.address.clone().ok_or_else(|| CliError::NoConfig {
        path: path.display().to_string(),
    })?;
    let credential = flag_password.ok_or_else(|| CliError::NoCredentials {
        profile: name.clone(),
    })?;

    let mut profile = ResolvedProfile {
        name,
        params: ConnectionParameters {
            address,
            port: DEFAULT_RCON_PORT,
            credential,
        },
        timeout: Duration::from_secs(cfg.defaults.timeout),
        roster: RosterConfig {
            poll_interval: Duration::from_secs(cfg.defaults.poll_interval.max(1)),
            ..RosterConfig::default()
        },
        profile_extension: DEFAULT_PROFILE_EXTENSION.into(),
    };
    apply_overrides(&mut profile, global)?;

    Ok(Target {
        profile,
        watch_path: None,
    })
}

fn apply_overrides(profile: &mut ResolvedProfile, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref address) = global.address {
        let address = address.trim();
        if address.is_empty() {
            return Err(CliError::Validation {
                field: "address".into(),
                reason: "must not be empty".into(),
            });
        }
        address.clone_into(&mut profile.params.address);
    }
    if let Some(port) = global.port {
        if port == 0 {
            return Err(CliError::Validation {
                field: "port".into(),
                reason: "must be between 1 and 65535".into(),
            });
        }
        profile.params.port = port;
    }
    if let Some(secs) = global.timeout {
        profile.timeout = Duration::from_secs(secs);
    }
    Ok(())
}

/// Comma-separated profile names for help text.
pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
