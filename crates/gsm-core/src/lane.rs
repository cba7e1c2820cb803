// ── Serial task lanes ──
//
// A lane is one worker task draining an unbounded FIFO of boxed futures.
// Enqueueing is synchronous, so the order of `submit` calls is the order
// work runs in, regardless of when the returned tickets are awaited.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};

use arc_swap::ArcSwapOption;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaneError {
    #[error("lane '{lane}' is closed")]
    Closed { lane: &'static str },

    #[error("work item on lane '{lane}' panicked: {message}")]
    Panicked { lane: &'static str, message: String },

    #[error("work item on lane '{lane}' was dropped before completing")]
    Abandoned { lane: &'static str },
}

/// Ordered, non-overlapping executor bound to one worker task.
///
/// The worker runs on whichever runtime the lane was spawned on; use
/// [`Lane::spawn_on`] to pin delivery to a specific runtime (for example a
/// UI thread's local runtime).
pub struct Lane {
    name: &'static str,
    sender: ArcSwapOption<mpsc::UnboundedSender<Job>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Lane {
    /// Spawn a lane on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn(name: &'static str) -> Self {
        Self::spawn_on(name, &Handle::current())
    }

    /// Spawn a lane whose worker runs on `handle`'s runtime.
    pub fn spawn_on(name: &'static str, handle: &Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = handle.spawn(run_lane(name, rx));
        Self {
            name,
            sender: ArcSwapOption::from_pointee(tx),
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_closed(&self) -> bool {
        self.sender.load().is_none()
    }

    /// Enqueue `work` behind everything already submitted.
    ///
    /// The work is queued before this returns; dropping the ticket does not
    /// cancel it. A panic inside `work` is caught and reported through the
    /// ticket, and the lane carries on with the next item.
    pub fn submit<F, T>(&self, work: F) -> Result<Ticket<T>, LaneError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let lane = self.name;
        let guard = self.sender.load();
        let Some(sender) = guard.as_ref() else {
            return Err(LaneError::Closed { lane });
        };

        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(work).catch_unwind().await.map_err(|payload| {
                let message = panic_message(payload.as_ref());
                warn!(lane, %message, "lane work item panicked");
                LaneError::Panicked { lane, message }
            });
            // Fire-and-forget submitters drop their ticket.
            let _ = tx.send(outcome);
        });

        sender.send(job).map_err(|_| LaneError::Closed { lane })?;
        Ok(Ticket { lane, rx })
    }

    /// Stop accepting work, let queued work drain, and wait for the worker
    /// to exit. Safe to call more than once; later calls wait for the first.
    ///
    /// Must not be awaited from inside a work item on the same lane.
    pub async fn shutdown(&self) {
        if self.sender.swap(None).is_some() {
            debug!(lane = self.name, "lane closed to new work");
        }

        let mut worker = self.worker.lock().await;
        if let Some(handle) = worker.take() {
            if let Err(e) = handle.await {
                warn!(lane = self.name, error = %e, "lane worker ended abnormally");
            }
            debug!(lane = self.name, "lane drained");
        }
    }
}

async fn run_lane(name: &'static str, mut rx: mpsc::UnboundedReceiver<Job>) {
    debug!(lane = name, "lane worker started");
    while let Some(job) = rx.recv().await {
        job.await;
    }
    debug!(lane = name, "lane worker stopped");
}

/// Completion handle for one unit of lane work.
pub struct Ticket<T> {
    lane: &'static str,
    rx: oneshot::Receiver<Result<T, LaneError>>,
}

impl<T> Future for Ticket<T> {
    type Output = Result<T, LaneError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let lane = self.lane;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(LaneError::Abandoned { lane })))
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn runs_items_in_submission_order() {
        let lane = Lane::spawn("test");
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

        let tickets: Vec<_> = (0..50)
            .map(|i| {
                let seen = Arc::clone(&seen);
                lane.submit(async move {
                    if i % 3 == 0 {
                        tokio::task::yield_now().await;
                    }
                    seen.lock().unwrap().push(i);
                    i
                })
                .unwrap()
            })
            .collect();

        // Await in reverse to show completion order doesn't depend on it.
        for (i, ticket) in tickets.into_iter().enumerate().rev() {
            assert_eq!(ticket.await.unwrap(), i);
        }
        assert_eq!(*seen.lock().unwrap(), (0..50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn ticket_stays_pending_while_earlier_work_runs() {
        let lane = Lane::spawn("test");
        let (release, gate) = oneshot::channel::<()>();
        let blocked = lane.submit(async move { gate.await.is_ok() }).unwrap();
        let mut queued = tokio_test::task::spawn(lane.submit(async { 5 }).unwrap());

        tokio::task::yield_now().await;
        tokio_test::assert_pending!(queued.poll());

        release.send(()).unwrap();
        assert!(blocked.await.unwrap());
        lane.submit(async {}).unwrap().await.unwrap();
        assert!(queued.is_woken());
        tokio_test::assert_ready_eq!(queued.poll(), Ok(5));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_runs_two_items_at_once() {
        let lane = Arc::new(Lane::spawn("test"));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut submitters = Vec::new();
        for _ in 0..4 {
            let lane = Arc::clone(&lane);
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            submitters.push(tokio::spawn(async move {
                let mut tickets = Vec::new();
                for _ in 0..10 {
                    let active = Arc::clone(&active);
                    let peak = Arc::clone(&peak);
                    tickets.push(
                        lane.submit(async move {
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(1)).await;
                            active.fetch_sub(1, Ordering::SeqCst);
                        })
                        .unwrap(),
                    );
                }
                for ticket in tickets {
                    ticket.await.unwrap();
                }
            }));
        }
        for submitter in submitters {
            submitter.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_item_does_not_halt_lane() {
        let lane = Lane::spawn("test");
        let failing = lane.submit(async { Err::<u32, &str>("boom") }).unwrap();
        let next = lane.submit(async { Ok::<u32, &str>(7) }).unwrap();

        assert_eq!(failing.await.unwrap(), Err("boom"));
        assert_eq!(next.await.unwrap(), Ok(7));
    }

    #[tokio::test]
    async fn panicking_item_is_contained() {
        let lane = Lane::spawn("test");
        let bad = lane
            .submit(async {
                panic!("listener exploded");
            })
            .unwrap();
        let good = lane.submit(async { "still running" }).unwrap();

        match bad.await {
            Err(LaneError::Panicked { lane, message }) => {
                assert_eq!(lane, "test");
                assert!(message.contains("listener exploded"));
            }
            other => panic!("expected panic report, got {other:?}"),
        }
        assert_eq!(good.await.unwrap(), "still running");
    }

    #[tokio::test]
    async fn shutdown_drains_queue_then_rejects() {
        let lane = Lane::spawn("test");
        let done = Arc::new(AtomicUsize::new(0));

        let tickets: Vec<_> = (0..5)
            .map(|_| {
                let done = Arc::clone(&done);
                lane.submit(async move {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap()
            })
            .collect();

        lane.shutdown().await;
        assert_eq!(done.load(Ordering::SeqCst), 5);
        for ticket in tickets {
            ticket.await.unwrap();
        }

        assert!(lane.is_closed());
        assert_eq!(
            lane.submit(async {}).err(),
            Some(LaneError::Closed { lane: "test" })
        );

        // Second shutdown is a no-op.
        lane.shutdown().await;
    }

    #[test]
    fn spawn_on_runs_work_on_the_given_runtime() {
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

        let thread_name = main.block_on(async {
            let lane = Lane::spawn_on("outbound", ui.handle());
            let name = lane
                .submit(async { std::thread::current().name().map(str::to_owned) })
                .unwrap()
                .await
                .unwrap();
            lane.shutdown().await;
            name
        });

        assert_eq!(thread_name.as_deref(), Some("ui-dispatch"));
    }
}
