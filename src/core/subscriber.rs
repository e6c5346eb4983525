//! # Subscriber handle and its consume loop.
//!
//! A [`Subscriber`] is the receiving end of one queue's fan-out. It owns exactly
//! one delivery channel; the queue's dispatch loop owns the sending side.
//!
//! ## Consume contract
//! ```text
//! loop {
//!   ├─► value = inbox.recv()          (None → channel closed → exit)
//!   ├─► handler.handle(value)         (panic caught → HandlerError::Panicked)
//!   └─► Err(e) → inbox.report(&e)     (HandlerFailed / HandlerPanicked event)
//! }
//! ```
//!
//! ## Rules
//! - Values are handled sequentially, in receipt order.
//! - A failing or panicking handler never stops the loop and never reaches the publisher.
//! - The loop ends when the delivery channel closes: explicit removal, broker
//!   shutdown, or the queue pruning a dropped handle.
//!
//! Any type that can hand out values one at a time can be driven the same way by
//! implementing [`Inbox`]; `tokio::sync::mpsc::Receiver<T>` already does.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc;

use crate::error::{HandlerError, panic_info};
use crate::events::{Bus, Event};
use crate::handlers::Handler;

/// Global counter for subscriber identities.
static SUBSCRIBER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a subscriber.
///
/// Used to address removal requests; displayed as `sub-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn next() -> Self {
        Self(SUBSCRIBER_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Counters returned by a finished consume loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeStats {
    /// Values taken from the inbox.
    pub received: u64,
    /// Values whose handler returned an error or panicked.
    pub failed: u64,
}

/// Source of values for a consume loop.
#[async_trait]
pub trait Inbox<T: Send + 'static>: Send {
    /// Waits for the next value; `None` once the source is closed and drained.
    async fn recv(&mut self) -> Option<T>;

    /// Reports a failed handler invocation.
    ///
    /// Default: the failure is discarded.
    fn report(&self, _err: &HandlerError) {}
}

/// Receiving handle for one queue subscription.
///
/// Created by [`Broker::create_subscriber`](crate::Broker::create_subscriber).
/// Dropping the handle detaches it: the dispatch loop prunes it on the next fan-out.
pub struct Subscriber<T> {
    id: SubscriberId,
    queue: Arc<str>,
    rx: mpsc::Receiver<T>,
    bus: Bus,
}

impl<T: Send + 'static> Subscriber<T> {
    pub(crate) fn new(id: SubscriberId, queue: Arc<str>, rx: mpsc::Receiver<T>, bus: Bus) -> Self {
        Self { id, queue, rx, bus }
    }

    /// Returns this subscriber's identity.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Returns the name of the queue this subscriber is attached to.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Receives the next delivered value.
    ///
    /// Returns `None` once the subscriber was removed or the broker closed and
    /// every in-flight value has been received.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Applies `handler` to every delivered value until the delivery channel closes.
    ///
    /// Handler failures are published as `HandlerFailed` / `HandlerPanicked` events.
    pub async fn consume<H: Handler<T>>(self, handler: H) -> ConsumeStats {
        consume(self, handler).await
    }
}

impl<T> From<&Subscriber<T>> for SubscriberId {
    fn from(sub: &Subscriber<T>) -> Self {
        sub.id
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("queue", &self.queue)
            .finish()
    }
}

#[async_trait]
impl<T: Send + 'static> Inbox<T> for Subscriber<T> {
    async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    fn report(&self, err: &HandlerError) {
        self.bus
            .publish(Event::handler_failed(Arc::clone(&self.queue), self.id, err));
    }
}

#[async_trait]
impl<T: Send + 'static> Inbox<T> for mpsc::Receiver<T> {
    async fn recv(&mut self) -> Option<T> {
        mpsc::Receiver::recv(self).await
    }
}

/// Drives `handler` over every value of `inbox` until it is closed.
///
/// Panics inside the handler are caught and reported like errors.
pub async fn consume<T, I, H>(mut inbox: I, handler: H) -> ConsumeStats
where
    T: Send + 'static,
    I: Inbox<T>,
    H: Handler<T>,
{
    let mut stats = ConsumeStats::default();

    while let Some(value) = inbox.recv().await {
        stats.received += 1;

        let outcome = match AssertUnwindSafe(handler.handle(value)).catch_unwind().await {
            Ok(res) => res,
            Err(panic_err) => Err(HandlerError::Panicked {
                info: panic_info(&*panic_err),
            }),
        };
        if let Err(err) = outcome {
            stats.failed += 1;
            inbox.report(&err);
        }
    }
    stats
}
