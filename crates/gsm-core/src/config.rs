// ── Runtime roster configuration ──
//
// Describes *what* the roster polls and how often. Built by the CLI or
// `gsm-config` from a profile; core never reads config files.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ROSTER_QUERY: &str = "ListPlayers";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterConfig {
    /// Directory holding one profile file per player.
    pub save_dir: PathBuf,
    /// Console command that lists connected players.
    pub query_command: String,
    /// Delay between the end of one poll cycle and the start of the next.
    pub poll_interval: Duration,
}

impl RosterConfig {
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            ..Self::default()
        }
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("ShooterGame/Saved/SavedArks"),
            query_command: DEFAULT_ROSTER_QUERY.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
