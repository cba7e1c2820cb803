//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use gsm_config::ConfigError;
use gsm_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the console at {endpoint}")]
    #[diagnostic(
        code(gsm::connection_failed),
        help(
            "Check that the server is running with RCON enabled and that\n\
             the RCON port is reachable from here.\n\
             Endpoint: {endpoint}"
        )
    )]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: gsm_rcon::Error,
    },

    #[error("Command '{command}' failed")]
    #[diagnostic(
        code(gsm::command_failed),
        help("The connection dropped mid-command. Run it again to reconnect.")
    )]
    CommandFailed {
        command: String,
        #[source]
        source: gsm_rcon::Error,
    },

    #[error("Console session closed")]
    #[diagnostic(code(gsm::session_closed))]
    SessionClosed {
        #[source]
        source: gsm_core::LaneError,
    },

    // ── Authentication ───────────────────────────────────────────────

    #[error("RCON password rejected by {endpoint}")]
    #[diagnostic(
        code(gsm::auth_failed),
        help(
            "Check ServerAdminPassword on the server and the password in\n\
             your profile, GSM_RCON_PASSWORD, or the system keyring."
        )
    )]
    AuthFailed { endpoint: String },

    #[error("No RCON password configured for profile '{profile}'")]
    #[diagnostic(
        code(gsm::no_credentials),
        help(
            "Pass --password, set GSM_RCON_PASSWORD, or add password_env\n\
             to the profile in your config file."
        )
    )]
    NoCredentials { profile: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(gsm::profile_not_found),
        help(
            "Available profiles: {available}\n\
             List them with: gsm config profiles"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(gsm::no_config),
        help(
            "Add a [profiles.default] section to {path}\n\
             or pass --address and --password."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(gsm::config))]
    Config(ConfigError),

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(gsm::validation))]
    Validation { field: String, reason: String },

    // ── Save data ────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(gsm::save_data),
        help("Check save_dir in your profile or pass --save-dir.")
    )]
    SaveData(CoreError),

    #[error(transparent)]
    #[diagnostic(code(gsm::core))]
    Core(CoreError),

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("RCON {operation} timed out after {seconds}s")]
    #[diagnostic(
        code(gsm::timeout),
        help("Increase the timeout with --timeout or check server responsiveness.")
    )]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON: {0}")]
    #[diagnostic(code(gsm::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::CommandFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── gsm_rcon::Error → CliError mapping ───────────────────────────────

fn from_transport(endpoint: String, source: gsm_rcon::Error) -> CliError {
    match source {
        gsm_rcon::Error::Authentication { .. } => CliError::AuthFailed { endpoint },
        gsm_rcon::Error::Timeout { operation, timeout } => CliError::Timeout {
            operation,
            seconds: timeout.as_secs(),
        },
        source => CliError::ConnectionFailed { endpoint, source },
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::TransportUnavailable { endpoint, source } => from_transport(endpoint, source),

            CoreError::SendFailed { command, source } => match source {
                gsm_rcon::Error::Timeout { operation, timeout } => Self::Timeout {
                    operation,
                    seconds: timeout.as_secs(),
                },
                source => Self::CommandFailed { command, source },
            },

            CoreError::Lane(source) => Self::SessionClosed { source },

            err @ CoreError::SaveData { .. } => Self::SaveData(err),
            err @ CoreError::ListenerFault { .. } => Self::Core(err),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn refused_connection_maps_to_connection_exit_code() {
        let err = CliError::from(CoreError::TransportUnavailable {
            endpoint: "127.0.0.1:27020".into(),
            source: gsm_rcon::Error::Closed,
        });
        assert!(matches!(err, CliError::ConnectionFailed { .. }));
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn rejected_password_maps_to_auth() {
        let err = CliError::from(CoreError::TransportUnavailable {
            endpoint: "h:1".into(),
            source: gsm_rcon::Error::Authentication { address: "h:1".into() },
        });
        assert!(matches!(err, CliError::AuthFailed { ref endpoint } if endpoint == "h:1"));
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn command_timeout_maps_to_timeout() {
        let err = CliError::from(CoreError::SendFailed {
            command: "ListPlayers".into(),
            source: gsm_rcon::Error::Timeout {
                operation: "response",
                timeout: Duration::from_secs(3),
            },
        });
        assert!(matches!(err, CliError::Timeout { seconds: 3, .. }));
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "port".into(),
            reason: "must be between 1 and 65535".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
