// ── Result listeners ──
//
// Copy-on-write registry of callbacks. Registration and removal swap in a
// new list; dispatch iterates whatever list was current when it started.
// Dispatch only ever runs on the session's outbound lane.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use tracing::warn;

use crate::command::CommandResult;
use crate::error::CoreError;
use crate::lane::{Lane, panic_message};

/// What a listener callback returns. Errors are logged, never propagated.
pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type Callback = Arc<dyn Fn(&CommandResult) -> ListenerResult + Send + Sync>;

pub(crate) struct ListenerSet {
    next_id: AtomicU64,
    entries: ArcSwap<Vec<(u64, Callback)>>,
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: ArcSwap::from_pointee(Vec::new()),
        }
    }

    pub(crate) fn insert(&self, callback: Callback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push((id, Arc::clone(&callback)));
            next
        });
        id
    }

    pub(crate) fn remove(&self, id: u64) -> bool {
        let previous = self.entries.rcu(|current| {
            current
                .iter()
                .filter(|(entry_id, _)| *entry_id != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|(entry_id, _)| *entry_id == id)
    }

    pub(crate) fn clear(&self) {
        self.entries.store(Arc::new(Vec::new()));
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.load().len()
    }

    /// Invoke every listener in registration order. A listener that
    /// returns an error or panics is logged and skipped; the rest still run.
    pub(crate) fn dispatch(&self, result: &CommandResult) {
        let entries = self.entries.load_full();
        for (id, callback) in entries.iter() {
            let message = match std::panic::catch_unwind(AssertUnwindSafe(|| callback(result))) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };
            let fault = CoreError::ListenerFault { id: *id, message };
            warn!(error = %fault, command = %result.command, "listener failed");
        }
    }
}

/// Keeps a listener registered while held.
///
/// [`release`](Self::release) deregisters and waits until no delivery to
/// this listener can still be in progress. Dropping the handle deregisters
/// too, but without waiting.
pub struct ListenerRegistration {
    id: u64,
    set: Arc<ListenerSet>,
    outbound: Arc<Lane>,
    released: bool,
}

impl ListenerRegistration {
    pub(crate) fn new(id: u64, set: Arc<ListenerSet>, outbound: Arc<Lane>) -> Self {
        Self {
            id,
            set,
            outbound,
            released: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn release(mut self) {
        self.released = true;
        self.set.remove(self.id);
        // A dispatch that loaded the old list may still be running; queue a
        // no-op behind it and wait for that.
        if let Ok(barrier) = self.outbound.submit(async {}) {
            let _ = barrier.await;
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        if !self.released {
            self.set.remove(self.id);
        }
    }
}
