// ── Domain model ──
//
// Player identity and records, plus the published roster collection.

pub mod identity;
pub mod player;
pub mod roster;

pub use identity::PlayerIdentity;
pub use player::{CORRUPTED_PROFILE_NAME, PlayerRecord, ProfileData, Validity};
pub use roster::Roster;
