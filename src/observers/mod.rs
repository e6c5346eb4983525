//! # Runtime event observers.
//!
//! This module provides the [`Observe`] trait and the internal `ObserverSet` that fans
//! runtime events out to every registered observer.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Broker / dispatch loop / consume loop ── publish(Event) ──► Bus
//!                                                               │
//!                                              observer_listener (Broker::start)
//!                                                               │
//!                                                        ObserverSet::emit
//!                                                   ┌───────────┼───────────┐
//!                                                   ▼           ▼           ▼
//!                                               LogWriter    Metrics     Custom
//! ```
//!
//! Observers see broker internals (queue registration, membership changes,
//! handler failures); they never see queue payloads.

mod observe;
mod set;

#[cfg(feature = "logging")]
mod log;

pub use observe::Observe;
pub(crate) use set::ObserverSet;

#[cfg(feature = "logging")]
pub use log::LogWriter;
