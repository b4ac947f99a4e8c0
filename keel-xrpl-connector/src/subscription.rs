//! # Event Subscriptions
//!
//! Handles returned by [`AccountHandle::subscribe`](crate::account::AccountHandle::subscribe).
//! A subscription delivers events of exactly one [`EventKind`] over its
//! own channel and unregisters itself from the tracker on [`close`]
//! (explicitly) or on drop (automatically), so listener bookkeeping can
//! never leak.
//!
//! [`close`]: EventSubscription::close

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::events::{AccountEvent, EventKind};
use crate::tracker::AccountCommand;

/// Identifies one registered listener within a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Unregisters the listener exactly once, whichever way it goes away.
///
/// The payload is an `Option` so that a manual close can take it and
/// leave nothing for the drop path.
#[derive(Debug)]
struct CloseGuard {
    info: Option<(ListenerId, mpsc::Sender<AccountCommand>)>,
}

impl CloseGuard {
    async fn close(mut self) {
        if let Some((id, command_tx)) = self.info.take() {
            tracing::debug!("Manual unregister for listener {:?}", id);
            let _ = command_tx.send(AccountCommand::Unregister(id)).await;
        }
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        // Only runs if the listener was not closed manually.
        if let Some((id, command_tx)) = self.info.take() {
            tracing::debug!("Automatic unregister (on drop) for listener {:?}", id);
            tokio::spawn(async move {
                command_tx.send(AccountCommand::Unregister(id)).await.ok();
            });
        }
    }
}

/// A live subscription to one kind of account event.
#[derive(Debug)]
pub struct EventSubscription {
    kind: EventKind,
    events_rx: mpsc::Receiver<AccountEvent>,
    guard: CloseGuard,
}

impl EventSubscription {
    pub(crate) fn new(
        kind: EventKind,
        id: ListenerId,
        events_rx: mpsc::Receiver<AccountEvent>,
        command_tx: mpsc::Sender<AccountCommand>,
    ) -> Self {
        Self {
            kind,
            events_rx,
            guard: CloseGuard {
                info: Some((id, command_tx)),
            },
        }
    }

    /// The event kind this subscription was opened for.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Receives the next event. Returns `None` once the tracker is gone.
    pub async fn next_event(&mut self) -> Option<AccountEvent> {
        self.events_rx.recv().await
    }

    /// Unregisters the listener from the tracker.
    ///
    /// This consumes the subscription; the automatic drop path will not
    /// unregister a second time.
    pub async fn close(self) {
        self.guard.close().await;
    }

    /// Converts the subscription into a [`Stream`] of events. The
    /// listener still unregisters when the stream is dropped.
    pub fn into_stream(self) -> EventStream {
        EventStream {
            kind: self.kind,
            inner: ReceiverStream::new(self.events_rx),
            guard: self.guard,
        }
    }
}

/// [`EventSubscription`] in `Stream` form.
#[derive(Debug)]
pub struct EventStream {
    kind: EventKind,
    inner: ReceiverStream<AccountEvent>,
    guard: CloseGuard,
}

impl EventStream {
    /// The event kind this stream was opened for.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Unregisters the listener from the tracker.
    pub async fn close(self) {
        self.guard.close().await;
    }
}

impl Stream for EventStream {
    type Item = AccountEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
