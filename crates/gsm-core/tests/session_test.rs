#![allow(clippy::unwrap_used)]
// Integration tests for `ConsoleSession` against an in-memory console.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use gsm_core::{
    CommandResult, ConnectionParameters, ConnectionStatus, Connector, ConsoleSession, CoreError,
    LaneError, ListenerResult, Transport,
};

// ── Fake console ────────────────────────────────────────────────────

#[derive(Default)]
struct ServerState {
    /// Commands in the order the server received them.
    received: Vec<String>,
    /// Endpoint of every connect attempt.
    connects: Vec<String>,
    in_flight: usize,
    peak_in_flight: usize,
    refuse_connect: bool,
    failing: HashSet<String>,
}

#[derive(Clone, Default)]
struct FakeConsole {
    state: Arc<Mutex<ServerState>>,
    delay: Duration,
}

impl FakeConsole {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn received(&self) -> Vec<String> {
        self.state.lock().unwrap().received.clone()
    }

    fn connects(&self) -> Vec<String> {
        self.state.lock().unwrap().connects.clone()
    }

    fn set_refuse(&self, refuse: bool) {
        self.state.lock().unwrap().refuse_connect = refuse;
    }

    fn fail_on(&self, command: &str) {
        self.state.lock().unwrap().failing.insert(command.to_owned());
    }
}

#[async_trait]
impl Connector for FakeConsole {
    async fn connect(
        &self,
        params: &ConnectionParameters,
    ) -> Result<Box<dyn Transport>, gsm_rcon::Error> {
        let mut state = self.state.lock().unwrap();
        state.connects.push(params.endpoint());
        if state.refuse_connect {
            return Err(gsm_rcon::Error::Authentication {
                address: params.endpoint(),
            });
        }
        Ok(Box::new(FakeTransport {
            console: self.clone(),
        }))
    }
}

struct FakeTransport {
    console: FakeConsole,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&mut self, command: &str) -> Result<String, gsm_rcon::Error> {
        {
            let mut state = self.console.state.lock().unwrap();
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
        }
        tokio::time::sleep(self.console.delay).await;

        let mut state = self.console.state.lock().unwrap();
        state.in_flight -= 1;
        state.received.push(command.to_owned());
        if state.failing.contains(command) {
            return Err(gsm_rcon::Error::Closed);
        }
        Ok(format!("ok {command}\n"))
    }

    async fn close(&mut self) -> Result<(), gsm_rcon::Error> {
        Ok(())
    }
}

fn params(port: u16) -> ConnectionParameters {
    ConnectionParameters::new("127.0.0.1", port, "secret")
}

fn session(console: &FakeConsole) -> ConsoleSession {
    ConsoleSession::new(Arc::new(console.clone()), params(27020))
}

/// Register a listener that records every result it sees.
fn recorder(session: &ConsoleSession) -> (gsm_core::ListenerRegistration, Arc<Mutex<Vec<CommandResult>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let registration = session.register_listener(move |result: &CommandResult| -> ListenerResult {
        sink.lock().unwrap().push(result.clone());
        Ok(())
    });
    (registration, seen)
}

// ── Ordering ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_delivery_order_matches_wire_order_across_callers() {
    let console = FakeConsole::with_delay(Duration::from_millis(1));
    let session = session(&console);
    let (_registration, seen) = recorder(&session);

    let mut callers = Vec::new();
    for caller in 0..4 {
        let session = session.clone();
        callers.push(tokio::spawn(async move {
            let pending: Vec<_> = (0..25)
                .map(|n| session.execute(format!("c{caller}-{n}")))
                .collect();
            for result in pending {
                result.await.unwrap();
            }
        }));
    }
    for caller in callers {
        caller.await.unwrap();
    }
    session.shutdown().await;

    let delivered: Vec<String> = seen.lock().unwrap().iter().map(|r| r.command.clone()).collect();
    assert_eq!(delivered.len(), 100);
    assert_eq!(delivered, console.received());

    // Each caller's own commands stay in the order it issued them.
    for caller in 0..4 {
        let prefix = format!("c{caller}-");
        let mine: Vec<_> = delivered.iter().filter(|c| c.starts_with(&prefix)).cloned().collect();
        let expected: Vec<_> = (0..25).map(|n| format!("c{caller}-{n}")).collect();
        assert_eq!(mine, expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sends_never_overlap() {
    let console = FakeConsole::with_delay(Duration::from_millis(2));
    let session = session(&console);

    let mut callers = Vec::new();
    for caller in 0..8 {
        let session = session.clone();
        callers.push(tokio::spawn(async move {
            for n in 0..5 {
                assert!(session.issue_command(format!("{caller}:{n}")).await);
            }
        }));
    }
    for caller in callers {
        caller.await.unwrap();
    }

    assert_eq!(console.state.lock().unwrap().peak_in_flight, 1);
    assert_eq!(console.received().len(), 40);
    session.shutdown().await;
}

#[tokio::test]
async fn test_results_resolve_in_order_even_when_awaited_out_of_order() {
    let console = FakeConsole::default();
    let session = session(&console);

    let first = session.execute("first");
    let second = session.execute("second");

    assert_eq!(second.await.unwrap().command, "second");
    assert_eq!(first.await.unwrap().lines, vec!["ok first"]);
    assert_eq!(console.received(), ["first", "second"]);
    session.shutdown().await;
}

// ── Failure and reconnection ────────────────────────────────────────

#[tokio::test]
async fn test_failure_does_not_skip_later_commands() {
    let console = FakeConsole::default();
    console.fail_on("c2");
    let session = session(&console);
    let (_registration, seen) = recorder(&session);

    let pending: Vec<_> = (0..5).map(|n| session.issue_command(format!("c{n}"))).collect();
    let mut outcomes = Vec::new();
    for result in pending {
        outcomes.push(result.await);
    }
    session.shutdown().await;

    assert_eq!(outcomes, [true, true, false, true, true]);
    assert_eq!(console.received(), ["c0", "c1", "c2", "c3", "c4"]);
    // The failed send discarded the transport; c3 opened a fresh one.
    assert_eq!(console.connects().len(), 2);

    let statuses: Vec<_> = seen.lock().unwrap().iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [
            ConnectionStatus::Connected,
            ConnectionStatus::Connected,
            ConnectionStatus::Disconnected,
            ConnectionStatus::Connected,
            ConnectionStatus::Connected,
        ]
    );
}

#[tokio::test]
async fn test_reconnect_is_lazy() {
    let console = FakeConsole::default();
    console.set_refuse(true);
    let session = session(&console);
    let (_registration, seen) = recorder(&session);

    let err = session.execute("status").await.unwrap_err();
    assert!(err.is_unavailable());
    assert!(!session.is_connected());

    // No background retries while the server is unreachable.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(console.connects().len(), 1);

    console.set_refuse(false);
    assert!(session.issue_command("status").await);
    assert_eq!(console.connects().len(), 2);
    assert!(session.is_connected());

    session.shutdown().await;
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].status, ConnectionStatus::Disconnected);
    assert!(seen[0].lines.is_empty());
    assert_eq!(seen[1].status, ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_parameter_change_waits_for_in_flight_command() {
    let console = FakeConsole::with_delay(Duration::from_millis(20));
    let session = session(&console);

    let slow = session.execute("slow");
    assert!(session.update_parameters(params(27021)));
    let after = session.execute("after");

    slow.await.unwrap();
    after.await.unwrap();

    assert_eq!(console.received(), ["slow", "after"]);
    assert_eq!(console.connects(), ["127.0.0.1:27020", "127.0.0.1:27021"]);
    assert_eq!(session.parameters().port, 27021);
    session.shutdown().await;
}

#[tokio::test]
async fn test_unchanged_parameters_do_not_reconnect() {
    let console = FakeConsole::default();
    let session = session(&console);

    assert!(session.issue_command("one").await);
    assert!(!session.update_parameters(params(27020)));
    assert!(session.issue_command("two").await);

    assert_eq!(console.connects().len(), 1);
    session.shutdown().await;
}

#[tokio::test]
async fn test_followed_parameters_are_applied() {
    let console = FakeConsole::default();
    let session = session(&console);
    let (tx, rx) = tokio::sync::watch::channel(params(27020));
    session.follow_parameters(rx).await;

    assert!(session.issue_command("one").await);
    tx.send(params(27030)).unwrap();
    // Let the follower observe the change before the next command.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(session.issue_command("two").await);

    assert_eq!(console.connects(), ["127.0.0.1:27020", "127.0.0.1:27030"]);
    session.shutdown().await;
}

#[tokio::test]
async fn test_explicit_reconnect_failure_leaves_no_transport() {
    let console = FakeConsole::default();
    let session = session(&console);

    assert!(session.issue_command("one").await);
    console.set_refuse(true);
    assert!(session.reconnect().await.is_err());
    assert!(!session.is_connected());

    console.set_refuse(false);
    assert!(session.issue_command("two").await);
    assert_eq!(console.connects().len(), 3);
    session.shutdown().await;
}

// ── Listeners ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_faulty_listeners_are_isolated() {
    let console = FakeConsole::default();
    let session = session(&console);

    let _failing = session.register_listener(|_: &CommandResult| -> ListenerResult {
        Err("listener refused".into())
    });
    let _panicking = session.register_listener(|_: &CommandResult| -> ListenerResult {
        panic!("listener bug");
    });
    let (_healthy, seen) = recorder(&session);
    assert_eq!(session.listener_count(), 3);

    for n in 0..3 {
        assert!(session.issue_command(format!("c{n}")).await);
    }
    session.shutdown().await;

    assert_eq!(seen.lock().unwrap().len(), 3);
    assert_eq!(session.listener_count(), 0);
}

#[tokio::test]
async fn test_released_listener_receives_nothing_more() {
    let console = FakeConsole::default();
    let session = session(&console);
    let (registration, seen) = recorder(&session);
    let (_other, other_seen) = recorder(&session);

    assert!(session.issue_command("before").await);
    registration.release().await;
    assert_eq!(session.listener_count(), 1);

    for n in 0..5 {
        assert!(session.issue_command(format!("after{n}")).await);
    }
    session.shutdown().await;

    let commands: Vec<_> = seen.lock().unwrap().iter().map(|r| r.command.clone()).collect();
    assert_eq!(commands, ["before"]);
    assert_eq!(other_seen.lock().unwrap().len(), 6);
}

#[tokio::test]
async fn test_dropped_registration_deregisters() {
    let console = FakeConsole::default();
    let session = session(&console);

    let (registration, _seen) = recorder(&session);
    assert_eq!(session.listener_count(), 1);
    drop(registration);
    assert_eq!(session.listener_count(), 0);
    session.shutdown().await;
}

#[test]
fn test_listeners_run_on_dispatch_runtime() {
    let ui = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("ui-dispatch")
        .enable_all()
        .build()
        .unwrap();
    let main = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let threads = main.block_on(async {
        let console = FakeConsole::default();
        let session =
            ConsoleSession::with_dispatch_handle(Arc::new(console), params(27020), ui.handle());
        let threads = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&threads);
        let _registration = session.register_listener(move |_: &CommandResult| -> ListenerResult {
            sink.lock().unwrap().push(std::thread::current().name().map(str::to_owned));
            Ok(())
        });

        assert!(session.issue_command("hello").await);
        session.shutdown().await;
        let threads = threads.lock().unwrap().clone();
        threads
    });

    assert_eq!(threads, [Some("ui-dispatch".to_owned())]);
    ui.shutdown_background();
}

// ── Shutdown ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_shutdown_drains_then_rejects() {
    let console = FakeConsole::with_delay(Duration::from_millis(5));
    let session = session(&console);
    let (_registration, seen) = recorder(&session);

    let queued: Vec<_> = (0..3).map(|n| session.execute(format!("q{n}"))).collect();
    session.shutdown().await;

    assert_eq!(console.received(), ["q0", "q1", "q2"]);
    assert_eq!(seen.lock().unwrap().len(), 3);
    for result in queued {
        assert!(result.await.is_ok());
    }

    match session.execute("late").await {
        Err(CoreError::Lane(LaneError::Closed { lane })) => assert_eq!(lane, "inbound"),
        other => panic!("expected closed lane, got {other:?}"),
    }
    assert!(!session.issue_command("late").await);
    assert_eq!(*session.connection_state().borrow(), ConnectionStatus::Disconnected);

    // Idempotent.
    session.shutdown().await;
}
