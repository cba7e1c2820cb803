// ── Command results ──
//
// Every command accepted by a session yields exactly one `CommandResult`,
// delivered to listeners in acceptance order. A command that could not be
// delivered still produces one, with `Disconnected` status and no lines.

use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub status: ConnectionStatus,
    pub command: String,
    pub lines: Vec<String>,
}

impl CommandResult {
    pub(crate) fn connected(command: String, body: &str) -> Self {
        Self {
            status: ConnectionStatus::Connected,
            command,
            lines: split_response(body),
        }
    }

    pub(crate) fn disconnected(command: String) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            command,
            lines: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}

/// Split a raw console reply into lines, dropping trailing whitespace and
/// blank lines (servers pad replies with `"\n "` and similar).
fn split_response(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_owned)
        .collect()
}
