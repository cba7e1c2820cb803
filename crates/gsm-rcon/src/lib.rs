//! Async remote-console client for game server processes.
//!
//! The crate is split in two layers:
//!
//! - **Transport traits** ([`Connector`], [`Transport`]): the opaque
//!   "open a connection, send a command, get text back" boundary that
//!   higher layers program against. Any error means the handle is unusable.
//!
//! - **Source RCON** ([`RconConnector`], [`RconTransport`]): a concrete
//!   implementation over TCP using the Valve RCON packet framing
//!   ([`packet`]), as spoken by ARK, Rust, Minecraft and most Source-engine
//!   derived dedicated servers.

pub mod client;
pub mod error;
pub mod packet;
pub mod transport;

pub use client::{DEFAULT_TIMEOUT, RconConnector, RconTransport};
pub use error::Error;
pub use transport::{ConnectionParameters, Connector, Transport};
