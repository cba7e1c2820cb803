//! Command dispatch: bridges CLI args -> console session / roster -> output.

pub mod config_cmd;
pub mod console;
pub mod exec;
pub mod players;

use std::sync::Arc;

use gsm_core::ConsoleSession;
use gsm_rcon::RconConnector;

use crate::cli::{Command, GlobalOpts};
use crate::config::Target;
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, target: Target, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Exec(args) => exec::handle(args, &target, global).await,
        Command::Players(args) => players::handle(args, &target, global).await,
        Command::Console(args) => console::handle(args, target, global).await,
        Command::Config(args) => config_cmd::handle(&args, global),
    }
}

/// A console session for the target over Source RCON. Nothing connects
/// until the first command.
pub(crate) fn open_session(target: &Target) -> ConsoleSession {
    let connector = Arc::new(RconConnector::new(target.profile.timeout));
    ConsoleSession::new(connector, target.profile.params.clone())
}
