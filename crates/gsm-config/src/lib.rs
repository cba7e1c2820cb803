//! Shared configuration for gsm tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! translation to `gsm_core` session and roster settings, and a file
//! watcher that feeds parameter changes to a running session.

mod watch;

use std::collections::BTreeMap;
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

use gsm_core::config::DEFAULT_ROSTER_QUERY;
use gsm_core::savedata::DEFAULT_PROFILE_EXTENSION;
use gsm_core::{ConnectionParameters, RosterConfig};

pub use watch::watch_profile;

/// Environment variable consulted for the RCON password when a profile
/// does not name its own.
pub const PASSWORD_ENV: &str = "GSM_RCON_PASSWORD";

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "GSM_CONFIG";

const KEYRING_SERVICE: &str = "gsm";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no RCON password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

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
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }

    /// The explicitly requested profile name, else the configured default.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// RCON connect/command timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Delay between roster cycles, seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_poll_interval() -> u64 {
    5
}

/// A named game server profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Host name or IP of the server.
    pub address: String,

    /// RCON port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// RCON password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the RCON password.
    pub password_env: Option<String>,

    /// Directory holding per-player profile files.
    pub save_dir: Option<PathBuf>,

    /// Extension of per-player profile files.
    pub profile_extension: Option<String>,

    /// Console command that lists connected players.
    pub roster_query: Option<String>,

    /// Override poll interval, seconds.
    pub poll_interval: Option<u64>,

    /// Override timeout, seconds.
    pub timeout: Option<u64>,
}

fn default_port() -> u16 {
    27020
}

/// Everything a tool needs to open a session and run a roster for one
/// profile.
#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub name: String,
    pub params: ConnectionParameters,
    pub timeout: Duration,
    pub roster: RosterConfig,
    pub profile_extension: String,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `GSM_CONFIG` if set, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("io", "gsm", "gsm").map_or_else(
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
    p.push("gsm");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from [`config_path`] + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// Environment variables use the `GSM_` prefix with `__` between nesting
/// levels, e.g. `GSM_DEFAULTS__TIMEOUT=3`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("GSM_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the RCON password from the credential chain.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Tool-wide env var
    if let Ok(val) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(val));
    }

    // 3. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/rcon")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Translate a named profile into session and roster settings.
///
/// `password` short-circuits the credential chain (e.g. a CLI flag).
pub fn resolve_profile(
    config: &Config,
    profile_name: &str,
    password: Option<SecretString>,
) -> Result<ResolvedProfile, ConfigError> {
    let profile = config.profile(profile_name)?;

    if profile.address.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "address".into(),
            reason: format!("profile '{profile_name}' has an empty address"),
        });
    }
    if profile.port == 0 {
        return Err(ConfigError::Validation {
            field: "port".into(),
            reason: "must be between 1 and 65535".into(),
        });
    }

    let credential = match password {
        Some(pw) => pw,
        None => resolve_password(profile, profile_name)?,
    };

    let mut roster = RosterConfig::default();
    if let Some(ref dir) = profile.save_dir {
        roster.save_dir.clone_from(dir);
    }
    roster.query_command = profile
        .roster_query
        .clone()
        .unwrap_or_else(|| DEFAULT_ROSTER_QUERY.into());
    roster.poll_interval = Duration::from_secs(
        profile
            .poll_interval
            .unwrap_or(config.defaults.poll_interval)
            .max(1),
    );

    Ok(ResolvedProfile {
        name: profile_name.into(),
        params: ConnectionParameters {
            address: profile.address.trim().to_owned(),
            port: profile.port,
            credential,
        },
        timeout: Duration::from_secs(profile.timeout.unwrap_or(config.defaults.timeout)),
        roster,
        profile_extension: profile
            .profile_extension
            .clone()
            .unwrap_or_else(|| DEFAULT_PROFILE_EXTENSION.into()),
    })
}
