//! `gsm console`: an interactive line-per-command console.
//!
//! Replies are printed by a session listener, so output also covers
//! commands whose callers stopped waiting. Edits to the profile in the
//! config file are followed without restarting.

use std::io::{IsTerminal, Write};
use std::time::Duration;

use owo_colors::OwoColorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use gsm_core::{CommandResult, ConsoleSession, ListenerResult};

use crate::cli::{ConsoleArgs, GlobalOpts};
use crate::config::Target;
use crate::error::CliError;
use crate::output;

const CONFIG_POLL: Duration = Duration::from_secs(2);

pub async fn handle(args: ConsoleArgs, target: Target, global: &GlobalOpts) -> Result<(), CliError> {
    let session = super::open_session(&target);
    let color = output::should_color(global.color);
    let quiet = global.quiet;
    let printer = session.register_listener(move |result: &CommandResult| -> ListenerResult {
        print_result(result, color, quiet)
    });

    let cancel = CancellationToken::new();
    if let (false, Some(path)) = (args.no_follow, target.watch_path) {
        let updates = gsm_config::watch_profile(path, target.profile.name.clone(), CONFIG_POLL, cancel.clone())?;
        session.follow_parameters(updates).await;
        debug!(profile = %target.profile.name, "following config changes");
    }

    let result = read_loop(&session, quiet).await;

    printer.release().await;
    cancel.cancel();
    session.shutdown().await;
    result
}

async fn read_loop(session: &ConsoleSession, quiet: bool) -> Result<(), CliError> {
    let interactive = std::io::stdin().is_terminal() && !quiet;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if interactive {
            prompt(&session.parameters().endpoint());
        }
        let line = tokio::select! {
            biased;
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };

        let command = line.trim();
        match command {
            "" => {}
            "exit" | "quit" => break,
            command => {
                // Wait for the round trip so the reply lands before the next prompt.
                if !session.issue_command(command).await {
                    info!(%command, "command not delivered");
                }
            }
        }
    }
    Ok(())
}

fn prompt(endpoint: &str) {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "{endpoint}> ");
    let _ = stderr.flush();
}

fn print_result(result: &CommandResult, color: bool, quiet: bool) -> ListenerResult {
    if !result.is_connected() {
        let msg = format!("'{}' was not delivered (disconnected)", result.command);
        if color {
            eprintln!("{}", msg.red());
        } else {
            eprintln!("{msg}");
        }
        return Ok(());
    }
    if quiet {
        return Ok(());
    }
    let mut stdout = std::io::stdout().lock();
    for line in &result.lines {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()?;
    Ok(())
}
