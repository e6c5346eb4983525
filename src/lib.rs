//! # embedq
//!
//! **embedq** is a lightweight in-process publish/subscribe broker for Rust.
//!
//! Producers put values into named queues; every subscriber attached to a queue
//! receives its own copy of each value, in order. The broker is designed to be
//! embedded in a single process as a building block for pipelines and services.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   put("orders", v)         put("audit", v)
//!         │                        │
//!         ▼                        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Broker (queue registry + lifecycle)                              │
//! │  - registry: name ─► Queue                                        │
//! │  - pending: Dispatcher handed over to start()                     │
//! │  - Bus (broadcast runtime events)                                 │
//! └──────┬──────────────────────────┬─────────────────────────────────┘
//!        ▼                          ▼
//!   ┌──────────────┐          ┌──────────────┐
//!   │ Queue orders │          │ Queue audit  │
//!   │ [intake buf] │          │ [intake buf] │
//!   └──────┬───────┘          └──────┬───────┘
//!          ▼                         ▼
//!   dispatch loop              dispatch loop        (one task per queue)
//!    ┌─────┴─────┐                   │
//!    ▼           ▼                   ▼
//!  sub-1       sub-2               sub-3             (delivery channel each)
//!    │           │                   │
//!  consume()   consume()           recv()
//!    │
//!    └─ handler error / panic ──► Bus ──► observer listener ──► ObserverSet
//!                                                          ┌────────┼────────┐
//!                                                          ▼        ▼        ▼
//!                                                       worker1  worker2  workerN
//! ```
//!
//! ### Lifecycle
//! ```text
//! Unstarted ──start()──► Running ──close()──► Closed
//!
//! create_queue(name)   → register queue, park its dispatch loop on the pending channel
//! start()              → launch parked and future dispatch loops, run until close()
//! close()              → end every dispatch loop, close every subscriber channel,
//!                        release blocked put() calls with BrokerError::Closed
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                       |
//! |-------------------|---------------------------------------------------------------|------------------------------------------|
//! | **Broker**        | Named queues, fan-out delivery, start/close lifecycle.        | [`Broker`], [`BrokerState`]              |
//! | **Subscribers**   | Receiving handles and the consume loop.                       | [`Subscriber`], [`Inbox`], [`consume`]   |
//! | **Handlers**      | Per-value processing as trait objects or closures.            | [`Handler`], [`HandlerFn`]               |
//! | **Observer API**  | Hook into broker events (logging, metrics, alerting).         | [`Observe`]                              |
//! | **Errors**        | Typed errors for routing and handler execution.               | [`BrokerError`], [`HandlerError`]        |
//! | **Configuration** | Centralize queue and bus capacities.                          | [`BrokerConfig`]                         |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use embedq::{Broker, BrokerConfig, HandlerError, HandlerFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = Broker::<String>::new(BrokerConfig::default());
//!     broker.create_queue("greetings", 10);
//!
//!     let sub = broker.create_subscriber("greetings")?;
//!     let worker = tokio::spawn(sub.consume(HandlerFn::new(|msg: String| async move {
//!         println!("got {msg}");
//!         Ok::<(), HandlerError>(())
//!     })));
//!
//!     let runner = {
//!         let broker = broker.clone();
//!         tokio::spawn(async move { broker.start().await })
//!     };
//!
//!     broker.put("greetings", "hello".to_string()).await?;
//!
//!     broker.close();
//!     runner.await?;
//!     worker.await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod handlers;
mod observers;

// ---- Public re-exports ----

pub use crate::core::{
    Broker, BrokerBuilder, BrokerState, ConsumeStats, Inbox, Subscriber, SubscriberId, consume,
};
pub use config::{BrokerConfig, MAX_CHANNEL_CAPACITY};
pub use error::{BrokerError, HandlerError};
pub use events::{Event, EventKind};
pub use handlers::{Handler, HandlerFn};
pub use observers::Observe;

// Optional: expose a simple built-in logger observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;
