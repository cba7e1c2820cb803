// ── Player domain types ──

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::identity::PlayerIdentity;

/// Display name given to records whose profile file name is not an id.
pub const CORRUPTED_PROFILE_NAME: &str = "<corrupted profile>";

/// Whether a record is backed by a readable saved profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Validity {
    /// Seen live, never corroborated by a saved profile.
    Pending,
    /// Backed by a saved profile with a parseable id.
    Valid,
    /// Backed by a saved profile whose id could not be parsed.
    Invalid,
}

/// Fields derived from a player's saved profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileData {
    pub player_name: Option<String>,
    pub character_name: Option<String>,
    pub tribe_name: Option<String>,
    pub level: Option<u32>,
    pub file: Option<PathBuf>,
    pub last_saved: Option<DateTime<Utc>>,
    /// Anything else a decoder extracted.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// The canonical player record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub identity: PlayerIdentity,
    pub name: String,
    pub online: bool,
    pub validity: Validity,

    // Live telemetry (only while online)
    pub score: Option<i64>,
    pub connected_for: Option<Duration>,

    pub profile: ProfileData,
}

impl PlayerRecord {
    /// A record with nothing known about it yet beyond its identity.
    pub fn new(identity: PlayerIdentity) -> Self {
        Self {
            name: identity.to_string(),
            identity,
            online: false,
            validity: Validity::Pending,
            score: None,
            connected_for: None,
            profile: ProfileData::default(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }
}
