// ── RCON error types ──
//
// Transport-layer failures. Callers above this crate treat every variant
// the same way ("handle unusable"); the variants exist for diagnostics.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("RCON authentication rejected by {address}")]
    Authentication { address: String },

    #[error("RCON {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("command is {len} bytes, RCON packets carry at most {limit}")]
    CommandTooLong { len: usize, limit: usize },

    #[error("malformed RCON packet: {0}")]
    Malformed(String),

    #[error("connection closed by server")]
    Closed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure happened before a session was established.
    pub fn is_connect(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::Authentication { .. }
                | Self::Timeout {
                    operation: "connect" | "authentication",
                    ..
                }
        )
    }
}
