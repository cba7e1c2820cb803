//! Live console layer between `gsm-rcon` and user-facing tools (CLI, GUI).
//!
//! This crate owns the runtime side of a managed game server's remote
//! console:
//!
//! - **[`Lane`]**: A single-worker FIFO task runner. Work submitted to a
//!   lane runs in submission order, one item at a time, and every item gets
//!   its own [`Ticket`]. Sessions use one lane for network I/O and a second
//!   one (optionally on another runtime) for result delivery.
//!
//! - **[`ConsoleSession`]**: Serializes commands from any number of
//!   callers onto one RCON connection, reconnects lazily after failures or
//!   parameter changes, and fans [`CommandResult`]s out to registered
//!   listeners in order.
//!
//! - **[`PlayerRoster`]**: A self-rescheduling poll loop that queries the
//!   live player list through a session and reconciles it with saved
//!   profiles from a [`SaveDataProvider`] into one [`Roster`], published
//!   by whole replacement and observable through a [`RosterStream`].

pub mod command;
pub mod config;
pub mod error;
pub mod lane;
pub mod model;
pub mod roster;
pub mod savedata;
pub mod session;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{CommandResult, ConnectionStatus};
pub use config::RosterConfig;
pub use error::CoreError;
pub use lane::{Lane, LaneError, Ticket};
pub use roster::{CommandPath, CycleOutcome, PlayerRoster};
pub use savedata::{MetadataOnly, ProfileDecoder, ProfileDirectory, SaveDataProvider, SavedProfile};
pub use session::{ConsoleSession, ListenerRegistration, ListenerResult};
pub use stream::{RosterStream, RosterWatchStream};

pub use model::{CORRUPTED_PROFILE_NAME, PlayerIdentity, PlayerRecord, ProfileData, Roster, Validity};

// The transport boundary is part of this crate's public surface.
pub use gsm_rcon::{ConnectionParameters, Connector, Transport};
