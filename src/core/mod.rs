//! Broker core: registry, queues, subscribers and lifecycle.
//!
//! The public API from this module is [`Broker`] plus the subscriber side
//! ([`Subscriber`], [`SubscriberId`], [`consume`]).
//!
//! Internal modules:
//! - [`broker`]: queue registry, routing, start/close lifecycle;
//! - [`queue`]: intake channel, membership set and dispatch loop;
//! - [`subscriber`]: subscriber handle and the consume loop;
//! - [`builder`]: broker construction with observers;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod broker;
mod builder;
mod queue;
mod shutdown;
mod subscriber;

pub use broker::{Broker, BrokerState};
pub use builder::BrokerBuilder;
pub use subscriber::{ConsumeStats, Inbox, Subscriber, SubscriberId, consume};
