//! `gsm players`: the merged roster, once or continuously.

use std::sync::Arc;

use tracing::warn;

use gsm_core::{CycleOutcome, PlayerRecord, PlayerRoster, ProfileDirectory, Roster};

use crate::cli::{GlobalOpts, PlayersArgs};
use crate::config::Target;
use crate::error::CliError;
use crate::output::{self, PlayerRow};

pub async fn handle(args: PlayersArgs, target: &Target, global: &GlobalOpts) -> Result<(), CliError> {
    let mut roster_config = target.profile.roster.clone();
    if let Some(ref dir) = args.save_dir {
        roster_config.save_dir.clone_from(dir);
    }
    if let Some(interval) = args.interval {
        roster_config.poll_interval = interval.into();
    }

    let session = super::open_session(target);
    let provider = Arc::new(ProfileDirectory::new(target.profile.profile_extension.clone()));
    let roster = PlayerRoster::new(Arc::new(session.clone()), provider, roster_config);

    let result = if args.watch {
        watch(&roster, &args, global).await
    } else {
        once(&roster, &args, global).await
    };

    roster.shutdown().await;
    session.shutdown().await;
    result
}

async fn once(roster: &PlayerRoster, args: &PlayersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match roster.poll_now().await {
        CycleOutcome::Completed { live: false, .. } => {
            warn!("live player list unavailable; showing saved profiles only");
        }
        CycleOutcome::Completed { .. } => {}
        CycleOutcome::Skipped | CycleOutcome::Aborted | CycleOutcome::Stopped => {
            warn!("roster cycle did not complete");
        }
    }
    print_roster(&roster.snapshot(), args, global)
}

async fn watch(roster: &PlayerRoster, args: &PlayersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut updates = roster.subscribe();
    roster.start().await;

    loop {
        tokio::select! {
            biased;
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            snapshot = updates.changed() => {
                let Some(snapshot) = snapshot else { break };
                print_roster(&snapshot, args, global)?;
                if !global.quiet {
                    eprintln!("{}", summary_line(&snapshot));
                }
            }
        }
    }
    Ok(())
}

fn print_roster(roster: &Roster, args: &PlayersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let records: Vec<&PlayerRecord> = roster
        .players()
        .filter(|p| !args.online || p.online)
        .collect();

    let rendered = output::render_list(
        global.output,
        &records,
        |r| PlayerRow::from_record(r, color),
        |r| r.name.clone(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn summary_line(roster: &Roster) -> String {
    let updated = roster.built_at().map_or_else(
        || "never".to_owned(),
        |t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string(),
    );
    format!(
        "{} online, {} known, updated {updated}",
        roster.online_count(),
        roster.len()
    )
}
