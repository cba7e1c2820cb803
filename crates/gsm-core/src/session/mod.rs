// ── Console session ──
//
// One RCON connection shared by any number of callers. Commands run on the
// inbound lane, one at a time, in the order they were issued. Results are
// handed to the outbound lane, which runs listener callbacks and nothing
// else, so a slow listener never holds up the wire and a slow server never
// holds up a listener.

mod listeners;

use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use gsm_rcon::{ConnectionParameters, Connector, Transport};

use crate::command::{CommandResult, ConnectionStatus};
use crate::error::CoreError;
use crate::lane::Lane;

use self::listeners::ListenerSet;
pub use self::listeners::{ListenerRegistration, ListenerResult};

/// Handle to a live console session. Cheap to clone; all clones share the
/// same connection, lanes and listeners.
#[derive(Clone)]
pub struct ConsoleSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    connector: Arc<dyn Connector>,
    /// Snapshot the next connect will use. Only inbound jobs write it.
    active: ArcSwap<ConnectionParameters>,
    /// Most recent snapshot handed to `update_parameters`.
    requested: ArcSwap<ConnectionParameters>,
    /// Only ever locked from inbound lane jobs (and shutdown, after the
    /// inbound lane has drained).
    transport: Mutex<Option<Box<dyn Transport>>>,
    listeners: Arc<ListenerSet>,
    inbound: Lane,
    outbound: Arc<Lane>,
    status: watch::Sender<ConnectionStatus>,
    cancel: CancellationToken,
    follower: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleSession {
    /// Create a session whose lanes both run on the current runtime.
    ///
    /// Nothing connects until the first command (or an explicit
    /// [`reconnect`](Self::reconnect)).
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(connector: Arc<dyn Connector>, params: ConnectionParameters) -> Self {
        Self::with_dispatch_handle(connector, params, &Handle::current())
    }

    /// Create a session whose listener callbacks run on `dispatch`'s runtime
    /// (for example a UI thread's runtime) while network I/O stays on the
    /// current one.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn with_dispatch_handle(
        connector: Arc<dyn Connector>,
        params: ConnectionParameters,
        dispatch: &Handle,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        let params = Arc::new(params);

        Self {
            inner: Arc::new(SessionInner {
                connector,
                active: ArcSwap::new(Arc::clone(&params)),
                requested: ArcSwap::new(params),
                transport: Mutex::new(None),
                listeners: Arc::new(ListenerSet::new()),
                inbound: Lane::spawn("inbound"),
                outbound: Arc::new(Lane::spawn_on("outbound", dispatch)),
                status,
                cancel: CancellationToken::new(),
                follower: Mutex::new(None),
            }),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Queue `command` and resolve with its result.
    ///
    /// The command is queued before this returns, so two calls made one
    /// after the other always reach the server in that order, even if the
    /// returned futures are awaited in a different order (or not at all).
    /// Exactly one [`CommandResult`] is delivered to listeners per accepted
    /// command; a failed command delivers one with `Disconnected` status.
    pub fn execute(
        &self,
        command: impl Into<String>,
    ) -> BoxFuture<'static, Result<CommandResult, CoreError>> {
        let command = command.into();
        let inner = Arc::clone(&self.inner);
        let ticket = self.inner.inbound.submit(inner.run_command(command));
        async move { ticket?.await? }.boxed()
    }

    /// Like [`execute`](Self::execute), reduced to whether the round trip
    /// succeeded. Failures are already logged by the session.
    pub fn issue_command(&self, command: impl Into<String>) -> BoxFuture<'static, bool> {
        let pending = self.execute(command);
        async move { pending.await.is_ok() }.boxed()
    }

    // ── Listeners ────────────────────────────────────────────────────

    /// Register a callback for every subsequent [`CommandResult`].
    ///
    /// Callbacks run on the outbound lane in registration order. A callback
    /// that returns an error or panics is logged and skipped for that result
    /// only.
    pub fn register_listener<F>(&self, callback: F) -> ListenerRegistration
    where
        F: Fn(&CommandResult) -> ListenerResult + Send + Sync + 'static,
    {
        let id = self.inner.listeners.insert(Arc::new(callback));
        debug!(listener = id, "listener registered");
        ListenerRegistration::new(
            id,
            Arc::clone(&self.inner.listeners),
            Arc::clone(&self.inner.outbound),
        )
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    // ── Connection ───────────────────────────────────────────────────

    /// Adopt a new parameter snapshot.
    ///
    /// Returns `false` (and does nothing) when `params` equals the last
    /// snapshot handed in. Otherwise a reconnect is queued behind any
    /// command already accepted; nothing in flight is interrupted.
    pub fn update_parameters(&self, params: ConnectionParameters) -> bool {
        let params = Arc::new(params);
        let previous = self.inner.requested.swap(Arc::clone(&params));
        if *previous == *params {
            return false;
        }

        info!(endpoint = %params.endpoint(), "connection parameters changed");
        let inner = Arc::clone(&self.inner);
        let queued = self.inner.inbound.submit(async move {
            inner.active.store(params);
            inner.run_reconnect().await
        });
        if let Err(e) = queued {
            debug!(error = %e, "parameter change after shutdown ignored");
        }
        true
    }

    /// Feed parameter snapshots from a runtime configuration observer into
    /// [`update_parameters`](Self::update_parameters) until the sender goes
    /// away or the session shuts down. Replaces any previous follower.
    pub async fn follow_parameters(&self, mut updates: watch::Receiver<ConnectionParameters>) {
        let initial = updates.borrow_and_update().clone();
        self.update_parameters(initial);

        let session = Arc::downgrade(&self.inner);
        let cancel = self.inner.cancel.child_token();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            debug!("parameter source closed");
                            break;
                        }
                        let params = updates.borrow_and_update().clone();
                        if !apply_parameters(&session, params) {
                            break;
                        }
                    }
                }
            }
        });

        if let Some(previous) = self.inner.follower.lock().await.replace(task) {
            previous.abort();
        }
    }

    /// Queue a reconnect: close any held transport and open a new one from
    /// the current snapshot. On failure the session is left without a
    /// transport and the next command tries again.
    pub fn reconnect(&self) -> BoxFuture<'static, Result<(), CoreError>> {
        let inner = Arc::clone(&self.inner);
        let ticket = self.inner.inbound.submit(inner.run_reconnect());
        async move { ticket?.await? }.boxed()
    }

    /// Connection status, updated whenever a connect succeeds or a
    /// transport is discarded.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        *self.inner.status.borrow() == ConnectionStatus::Connected
    }

    /// The most recent parameter snapshot handed to the session.
    pub fn parameters(&self) -> Arc<ConnectionParameters> {
        self.inner.requested.load_full()
    }

    // ── Shutdown ─────────────────────────────────────────────────────

    /// Drain and stop the inbound lane, then the outbound lane, then drop
    /// all listeners and close the connection. Commands issued afterwards
    /// fail with a closed-lane error.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(follower) = self.inner.follower.lock().await.take() {
            let _ = follower.await;
        }

        self.inner.inbound.shutdown().await;
        self.inner.outbound.shutdown().await;
        self.inner.listeners.clear();

        if let Some(mut transport) = self.inner.transport.lock().await.take() {
            if let Err(e) = transport.close().await {
                debug!(error = %e, "error closing transport on shutdown");
            }
        }
        self.inner.status.send_replace(ConnectionStatus::Disconnected);
        debug!("console session shut down");
    }
}

fn apply_parameters(session: &Weak<SessionInner>, params: ConnectionParameters) -> bool {
    match session.upgrade() {
        Some(inner) => {
            ConsoleSession { inner }.update_parameters(params);
            true
        }
        None => false,
    }
}

// ── Inbound lane jobs ────────────────────────────────────────────────

impl SessionInner {
    async fn run_command(self: Arc<Self>, command: String) -> Result<CommandResult, CoreError> {
        let outcome = self.send(&command).await;
        let result = match &outcome {
            Ok(body) => CommandResult::connected(command, body),
            Err(e) => {
                warn!(%command, error = %e, "console command failed");
                CommandResult::disconnected(command)
            }
        };
        self.publish(result.clone());
        outcome.map(|_| result)
    }

    /// Send on the held transport, opening one first if there is none. A
    /// transport that fails a send is closed and discarded.
    async fn send(&self, command: &str) -> Result<String, CoreError> {
        let mut slot = self.transport.lock().await;
        let mut transport = match slot.take() {
            Some(transport) => transport,
            None => self.open().await?,
        };

        match transport.send(command).await {
            Ok(body) => {
                *slot = Some(transport);
                Ok(body)
            }
            Err(source) => {
                if let Err(e) = transport.close().await {
                    debug!(error = %e, "error closing failed transport");
                }
                self.status.send_replace(ConnectionStatus::Disconnected);
                Err(CoreError::SendFailed {
                    command: command.to_owned(),
                    source,
                })
            }
        }
    }

    async fn run_reconnect(self: Arc<Self>) -> Result<(), CoreError> {
        let mut slot = self.transport.lock().await;
        if let Some(mut old) = slot.take() {
            if let Err(e) = old.close().await {
                debug!(error = %e, "error closing transport before reconnect");
            }
            self.status.send_replace(ConnectionStatus::Disconnected);
        }

        match self.open().await {
            Ok(transport) => {
                *slot = Some(transport);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "reconnect failed; will retry on next command");
                Err(e)
            }
        }
    }

    async fn open(&self) -> Result<Box<dyn Transport>, CoreError> {
        let params = self.active.load_full();
        let endpoint = params.endpoint();
        debug!(%endpoint, "opening console connection");

        match self.connector.connect(&params).await {
            Ok(transport) => {
                info!(%endpoint, "console connected");
                self.status.send_replace(ConnectionStatus::Connected);
                Ok(transport)
            }
            Err(source) => {
                self.status.send_replace(ConnectionStatus::Disconnected);
                Err(CoreError::TransportUnavailable { endpoint, source })
            }
        }
    }

    /// Hand a result to the outbound lane. Never waits for delivery.
    fn publish(&self, result: CommandResult) {
        let listeners = Arc::clone(&self.listeners);
        if let Err(e) = self
            .outbound
            .submit(async move { listeners.dispatch(&result) })
        {
            debug!(error = %e, "result dropped, outbound lane closed");
        }
    }
}
