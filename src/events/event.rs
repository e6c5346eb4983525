//! # Runtime events emitted by the broker, its dispatch loops and consume loops.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Queue events**: registration and dispatch loop start/stop
//! - **Membership events**: subscriber attach, removal request, detach
//! - **Handler events**: failures and panics inside subscriber handlers
//! - **Runtime events**: observer overflow/panic and broker shutdown
//!
//! The [`Event`] struct carries additional metadata such as timestamps, queue name,
//! subscriber id and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use embedq::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::QueueCreated)
//!     .with_queue("orders")
//!     .with_capacity(10);
//!
//! assert_eq!(ev.kind, EventKind::QueueCreated);
//! assert_eq!(ev.queue.as_deref(), Some("orders"));
//! assert_eq!(ev.capacity, Some(10));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::SubscriberId;
use crate::error::HandlerError;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Queue events ===
    /// A previously unseen queue name was registered.
    ///
    /// Sets:
    /// - `queue`: queue name
    /// - `capacity`: resolved intake capacity
    QueueCreated,

    /// The queue's dispatch loop was launched by `start()`.
    ///
    /// Sets:
    /// - `queue`: queue name
    DispatchStarted,

    /// The queue's dispatch loop exited (shutdown).
    ///
    /// Sets:
    /// - `queue`: queue name
    DispatchStopped,

    // === Membership events ===
    /// A subscriber was attached to a queue.
    ///
    /// Sets:
    /// - `queue`: queue name
    /// - `subscriber`: subscriber id
    SubscriberAttached,

    /// A removal request was handed to the queue's dispatch loop.
    ///
    /// Sets:
    /// - `queue`: queue name
    /// - `subscriber`: subscriber id
    SubscriberRemoveRequested,

    /// A subscriber left the membership set.
    ///
    /// Sets:
    /// - `queue`: queue name
    /// - `subscriber`: subscriber id
    /// - `reason`: `"removed"` (explicit request) or `"dropped"` (handle went away)
    SubscriberDetached,

    // === Handler events ===
    /// A subscriber handler returned an error for one value.
    ///
    /// Sets:
    /// - `queue`: queue name
    /// - `subscriber`: subscriber id
    /// - `reason`: error message
    HandlerFailed,

    /// A subscriber handler panicked; the consume loop kept running.
    ///
    /// Sets:
    /// - `queue`: queue name
    /// - `subscriber`: subscriber id
    /// - `reason`: panic info
    HandlerPanicked,

    // === Observer events ===
    /// Observer dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `observer`: observer name
    /// - `reason`: reason string (e.g., "full", "closed")
    ObserverOverflow,

    /// Observer panicked during event processing.
    ///
    /// Sets:
    /// - `observer`: observer name
    /// - `reason`: panic info/message
    ObserverPanicked,

    // === Shutdown events ===
    /// `close()` was called; every channel is being torn down.
    ShutdownRequested,

    /// `start()` is about to return: every dispatch loop has exited.
    BrokerStopped,
}

impl EventKind {
    /// Returns a short stable label (kebab-case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::QueueCreated => "queue-created",
            EventKind::DispatchStarted => "dispatch-started",
            EventKind::DispatchStopped => "dispatch-stopped",
            EventKind::SubscriberAttached => "subscriber-attached",
            EventKind::SubscriberRemoveRequested => "subscriber-remove-requested",
            EventKind::SubscriberDetached => "subscriber-detached",
            EventKind::HandlerFailed => "handler-failed",
            EventKind::HandlerPanicked => "handler-panicked",
            EventKind::ObserverOverflow => "observer-overflow",
            EventKind::ObserverPanicked => "observer-panicked",
            EventKind::ShutdownRequested => "shutdown-requested",
            EventKind::BrokerStopped => "broker-stopped",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the queue, if applicable.
    pub queue: Option<Arc<str>>,
    /// Subscriber the event refers to, if applicable.
    pub subscriber: Option<SubscriberId>,
    /// Name of the observer (overflow/panic events only).
    pub observer: Option<&'static str>,
    /// Resolved intake capacity (queue creation only).
    pub capacity: Option<usize>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            queue: None,
            subscriber: None,
            observer: None,
            capacity: None,
            reason: None,
        }
    }

    /// Attaches a queue name.
    #[inline]
    pub fn with_queue(mut self, queue: impl Into<Arc<str>>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Attaches a subscriber id.
    #[inline]
    pub fn with_subscriber(mut self, id: SubscriberId) -> Self {
        self.subscriber = Some(id);
        self
    }

    /// Attaches a resolved queue capacity.
    #[inline]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a handler failure event; panics map to [`EventKind::HandlerPanicked`].
    pub fn handler_failed(queue: Arc<str>, id: SubscriberId, err: &HandlerError) -> Self {
        let kind = match err {
            HandlerError::Panicked { .. } => EventKind::HandlerPanicked,
            _ => EventKind::HandlerFailed,
        };
        Event::now(kind)
            .with_queue(queue)
            .with_subscriber(id)
            .with_reason(err.as_message())
    }

    /// Creates a subscriber detach event.
    #[inline]
    pub fn subscriber_detached(queue: Arc<str>, id: SubscriberId, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberDetached)
            .with_queue(queue)
            .with_subscriber(id)
            .with_reason(reason)
    }

    /// Creates an observer overflow event for an event `dropped` by `observer`.
    ///
    /// The queue and subscriber of the dropped event are carried over, so the
    /// loss can be traced back to the queue it concerned.
    pub fn observer_overflow(
        observer: &'static str,
        reason: &'static str,
        dropped: &Event,
    ) -> Self {
        let mut ev = Event::now(EventKind::ObserverOverflow).with_reason(reason);
        ev.observer = Some(observer);
        ev.queue = dropped.queue.clone();
        ev.subscriber = dropped.subscriber;
        ev
    }

    /// Creates an observer panic event.
    #[inline]
    pub fn observer_panicked(observer: &'static str, info: String) -> Self {
        let mut ev = Event::now(EventKind::ObserverPanicked).with_reason(info);
        ev.observer = Some(observer);
        ev
    }

    #[inline]
    pub fn is_observer_overflow(&self) -> bool {
        matches!(self.kind, EventKind::ObserverOverflow)
    }
}
