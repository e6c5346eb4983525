//! # Runtime event observer trait.
//!
//! Provides [`Observe`] an extension point for plugging custom event handlers
//! (logging, metrics, alerting) into the broker.
//!
//! Each observer gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-observer bounded queue** (capacity via [`Observe::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as `EventKind::ObserverPanicked`)
//!
//! ## Architecture
//! ```text
//! ObserverSet ──► [bounded queue] ──► worker task ──► observer.on_event()
//!                                  └─► panic caught → EventKind::ObserverPanicked
//! ```
//!
//! ## Rules
//! - A slow observer only affects its own queue; it never slows down fan-out of payloads.
//! - Queue overflow drops the event **for this observer only** and publishes
//!   `EventKind::ObserverOverflow`.
//! - Events are processed sequentially (FIFO) per observer.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use embedq::{Event, EventKind, Observe};
//!
//! struct Metrics;
//!
//! #[async_trait]
//! impl Observe for Metrics {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::HandlerFailed) {
//!             // export a metric, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "metrics" }
//!     fn queue_capacity(&self) -> usize { 2048 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Runtime event observer.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated worker task, not in the publisher context.
    async fn on_event(&self, event: &Event);

    /// Returns the observer name used in overflow/panic events.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this observer.
    ///
    /// The runtime clamps capacity to a minimum of 1.
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
