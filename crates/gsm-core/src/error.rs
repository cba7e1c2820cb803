// ── Core error types ──
//
// Nothing here is process-fatal. Transport failures surface to the caller
// of the command that hit them; listener and save-data failures are logged
// and absorbed by the session and roster respectively.

use std::path::PathBuf;

use thiserror::Error;

use crate::lane::LaneError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Console at {endpoint} is unavailable: {source}")]
    TransportUnavailable {
        endpoint: String,
        #[source]
        source: gsm_rcon::Error,
    },

    #[error("Command '{command}' failed: {source}")]
    SendFailed {
        command: String,
        #[source]
        source: gsm_rcon::Error,
    },

    // ── Execution errors ─────────────────────────────────────────────
    #[error(transparent)]
    Lane(#[from] LaneError),

    #[error("Listener {id} failed: {message}")]
    ListenerFault { id: u64, message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Cannot read save data in {}: {reason}", path.display())]
    SaveData { path: PathBuf, reason: String },
}

impl CoreError {
    /// Whether the error means the console could not be reached at all,
    /// as opposed to a command failing on an open connection.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::TransportUnavailable { .. })
    }
}
