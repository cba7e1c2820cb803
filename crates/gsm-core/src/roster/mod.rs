// ── Player roster ──
//
// A poll loop that asks the console who is online, reads the saved
// profiles, and publishes the merged result as a fresh `Roster`. Cycles run
// on the roster's own lane and never overlap; the next one is scheduled
// only after the previous one finished, whatever its outcome.

mod live;
mod merge;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::command::CommandResult;
use crate::config::RosterConfig;
use crate::error::CoreError;
use crate::lane::Lane;
use crate::model::Roster;
use crate::savedata::SaveDataProvider;
use crate::session::ConsoleSession;
use crate::stream::RosterStream;

pub use live::{LivePlayer, parse_player_list};

/// Something that can run a console command and return its result.
#[async_trait]
pub trait CommandPath: Send + Sync {
    async fn query(&self, command: &str) -> Result<CommandResult, CoreError>;
}

#[async_trait]
impl CommandPath for ConsoleSession {
    async fn query(&self, command: &str) -> Result<CommandResult, CoreError> {
        self.execute(command).await
    }
}

/// How a requested poll cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A new roster was published. `live` is false when the player query
    /// failed and only saved profiles were used.
    Completed { players: usize, live: bool },
    /// Another cycle was already running.
    Skipped,
    /// The cycle panicked; the previous roster stays published.
    Aborted,
    /// The roster has been shut down.
    Stopped,
}

#[derive(Clone)]
pub struct PlayerRoster {
    inner: Arc<RosterInner>,
}

struct RosterInner {
    path: Arc<dyn CommandPath>,
    provider: Arc<dyn SaveDataProvider>,
    config: RosterConfig,
    lane: Lane,
    in_progress: AtomicBool,
    snapshot: watch::Sender<Arc<Roster>>,
    cycles: AtomicU64,
    cancel: CancellationToken,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl PlayerRoster {
    /// Create an idle roster. Call [`start`](Self::start) to begin polling
    /// or [`poll_now`](Self::poll_now) to run single cycles.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(
        path: Arc<dyn CommandPath>,
        provider: Arc<dyn SaveDataProvider>,
        config: RosterConfig,
    ) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Roster::default()));
        Self {
            inner: Arc::new(RosterInner {
                path,
                provider,
                config,
                lane: Lane::spawn("roster"),
                in_progress: AtomicBool::new(false),
                snapshot,
                cycles: AtomicU64::new(0),
                cancel: CancellationToken::new(),
                poller: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &RosterConfig {
        &self.inner.config
    }

    /// The most recently published roster.
    pub fn snapshot(&self) -> Arc<Roster> {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribe to roster replacements.
    pub fn subscribe(&self) -> RosterStream {
        RosterStream::new(self.inner.snapshot.subscribe())
    }

    /// Number of cycles that published a roster.
    pub fn cycles_completed(&self) -> u64 {
        self.inner.cycles.load(Ordering::Acquire)
    }

    pub fn cycle_in_progress(&self) -> bool {
        self.inner.in_progress.load(Ordering::Acquire)
    }

    /// Run one cycle now, unless one is already running.
    ///
    /// Once started, a cycle runs to completion even if this future is
    /// dropped.
    pub async fn poll_now(&self) -> CycleOutcome {
        if self
            .inner
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("roster cycle already in progress, skipping");
            return CycleOutcome::Skipped;
        }

        let guard = CycleGuard(Arc::clone(&self.inner));
        let inner = Arc::clone(&self.inner);
        let ticket = self.inner.lane.submit(async move {
            let _guard = guard;
            inner.run_cycle().await
        });

        match ticket {
            Ok(ticket) => match ticket.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "roster cycle aborted");
                    CycleOutcome::Aborted
                }
            },
            Err(_) => CycleOutcome::Stopped,
        }
    }

    /// Start the poll loop: run a cycle, wait the poll interval, repeat.
    /// Does nothing if the loop is already running.
    pub async fn start(&self) {
        let mut poller = self.inner.poller.lock().await;
        if poller.is_some() || self.inner.cancel.is_cancelled() {
            return;
        }
        debug!(
            interval_ms = self.inner.config.poll_interval.as_millis(),
            "starting roster poll loop"
        );
        *poller = Some(tokio::spawn(poll_task(
            self.clone(),
            self.inner.cancel.clone(),
        )));
    }

    /// Stop the poll loop, let a running cycle finish, and close the lane.
    /// Later calls to [`poll_now`](Self::poll_now) report `Stopped`.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.poller.lock().await.take() {
            let _ = handle.await;
        }
        self.inner.lane.shutdown().await;
        debug!("roster shut down");
    }
}

async fn poll_task(roster: PlayerRoster, cancel: CancellationToken) {
    let interval = roster.inner.config.poll_interval;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            outcome = roster.poll_now() => {
                if outcome == CycleOutcome::Stopped {
                    break;
                }
            }
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
    debug!("roster poll loop stopped");
}

/// Clears the in-progress flag however the cycle ends.
struct CycleGuard(Arc<RosterInner>);

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.in_progress.store(false, Ordering::Release);
    }
}

impl RosterInner {
    async fn run_cycle(&self) -> CycleOutcome {
        let started = Instant::now();
        let config = &self.config;

        let live = match self.path.query(&config.query_command).await {
            Ok(result) if result.is_connected() => Some(parse_player_list(&result.lines)),
            Ok(_) => {
                warn!(command = %config.query_command, "player query got no answer, using saved profiles only");
                None
            }
            Err(e) => {
                warn!(error = %e, "player query failed, using saved profiles only");
                None
            }
        };

        let saved = match self.provider.load(&config.save_dir).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(error = %e, "saved profiles unavailable this cycle");
                Vec::new()
            }
        };

        let previous = self.snapshot.borrow().clone();
        let roster = Roster::from_records(merge::merge(&previous, live.as_deref(), &saved));
        let players = roster.len();
        self.snapshot.send_replace(Arc::new(roster));
        let cycle = self.cycles.fetch_add(1, Ordering::AcqRel) + 1;

        debug!(
            cycle,
            players,
            live = live.is_some(),
            saved = saved.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "roster cycle complete"
        );
        CycleOutcome::Completed {
            players,
            live: live.is_some(),
        }
    }
}
