//! # LogWriter: simple event printer
//!
//! A minimal observer that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [queue-created] queue="orders" capacity=10
//! [dispatch-started] queue="orders"
//! [subscriber-attached] queue="orders" subscriber=sub-1
//! [handler-failed] queue="orders" subscriber=sub-1 err="error: bad payload"
//! [subscriber-detached] queue="orders" subscriber=sub-1 reason="removed"
//! [shutdown-requested]
//! [broker-stopped]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::observers::Observe;

/// Event writer observer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Renders one event as a single log line.
fn render(e: &Event) -> String {
    let label = e.kind.as_label();
    let queue = e.queue.as_deref().unwrap_or("unknown");
    let sub = e
        .subscriber
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let reason = e.reason.as_deref().unwrap_or("unknown");

    match e.kind {
        EventKind::QueueCreated => {
            format!("[{label}] queue={queue:?} capacity={:?}", e.capacity)
        }
        EventKind::DispatchStarted | EventKind::DispatchStopped => {
            format!("[{label}] queue={queue:?}")
        }
        EventKind::SubscriberAttached | EventKind::SubscriberRemoveRequested => {
            format!("[{label}] queue={queue:?} subscriber={sub}")
        }
        EventKind::SubscriberDetached => {
            format!("[{label}] queue={queue:?} subscriber={sub} reason={reason:?}")
        }
        EventKind::HandlerFailed | EventKind::HandlerPanicked => {
            format!("[{label}] queue={queue:?} subscriber={sub} err={reason:?}")
        }
        EventKind::ObserverOverflow => format!(
            "[{label}] observer={} reason={reason} queue={queue:?}",
            e.observer.unwrap_or("unknown")
        ),
        EventKind::ObserverPanicked => format!(
            "[{label}] observer={} info={reason}",
            e.observer.unwrap_or("unknown")
        ),
        EventKind::ShutdownRequested => match e.reason.as_deref() {
            Some(signal) => format!("[{label}] signal={signal}"),
            None => format!("[{label}]"),
        },
        EventKind::BrokerStopped => format!("[{label}]"),
    }
}

#[async_trait]
impl Observe for LogWriter {
    async fn on_event(&self, e: &Event) {
        println!("{}", render(e));
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
