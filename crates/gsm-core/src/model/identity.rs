// ── Player identity ──
//
// The merge key between live console output and saved profile files.
// Numeric platform ids are the normal case; anything else (a mangled file
// name, a non-numeric platform id) is kept verbatim so it can still be
// correlated and shown.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical identifier for a player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerIdentity {
    /// 64-bit numeric platform id (e.g. a SteamID64).
    Steam(u64),
    /// Raw identity text that did not parse as a numeric id.
    Unparsed(String),
}

impl PlayerIdentity {
    /// Parse a raw identity, falling back to [`Unparsed`](Self::Unparsed).
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<u64>() {
            Ok(id) => Self::Steam(id),
            Err(_) => Self::Unparsed(trimmed.to_owned()),
        }
    }

    pub fn as_steam_id(&self) -> Option<u64> {
        match self {
            Self::Steam(id) => Some(*id),
            Self::Unparsed(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Steam(_))
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Steam(id) => write!(f, "{id}"),
            Self::Unparsed(raw) => write!(f, "{raw}"),
        }
    }
}

impl FromStr for PlayerIdentity {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<u64> for PlayerIdentity {
    fn from(id: u64) -> Self {
        Self::Steam(id)
    }
}

impl From<&str> for PlayerIdentity {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}
