// ── Roster subscriptions ──
//
// Every completed roster cycle replaces the published roster. Subscribers
// hold a `watch` receiver and re-read the whole snapshot on change.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Roster;

/// A subscription to the published roster.
///
/// Offers the snapshot taken at subscription time, the latest snapshot, and
/// change notification via [`changed`](Self::changed) or as a `Stream`.
pub struct RosterStream {
    current: Arc<Roster>,
    receiver: watch::Receiver<Arc<Roster>>,
}

impl RosterStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Roster>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot as of subscription or the last [`changed`](Self::changed).
    pub fn current(&self) -> &Arc<Roster> {
        &self.current
    }

    /// Latest published snapshot (may be newer than `current`).
    pub fn latest(&self) -> Arc<Roster> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published roster.
    /// Returns `None` once the roster has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Roster>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` that yields the current roster first, then
    /// each replacement.
    pub fn into_stream(self) -> RosterWatchStream {
        RosterWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter over the roster `watch` channel.
pub struct RosterWatchStream {
    inner: WatchStream<Arc<Roster>>,
}

impl Stream for RosterWatchStream {
    type Item = Arc<Roster>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
