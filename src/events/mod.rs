//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the broker, dispatch loops,
//! consume loops and observer workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Broker` (queue registration, membership, shutdown),
//!   queue dispatch loops (start/stop, detach), subscriber consume loops
//!   (handler failures), `ObserverSet` workers (overflow/panic).
//! - **Consumers**: the observer listener spawned by `Broker::start()`, which fans
//!   out to the `ObserverSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
