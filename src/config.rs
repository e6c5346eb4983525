//! # Broker configuration.
//!
//! Provides [`BrokerConfig`] centralized settings for a [`Broker`](crate::Broker).
//!
//! Config is passed once, at construction:
//! `Broker::new(config)` or `Broker::builder(config)`.
//!
//! ## Sentinel values
//! - `create_queue(name, 0)` → the queue gets `queue_capacity` slots
//! - any capacity of `0` in the config itself is clamped to `1`
//! - channel capacities above [`MAX_CHANNEL_CAPACITY`] are clamped down to it

use tokio::sync::Semaphore;

/// Largest buffer a tokio mpsc channel accepts; bigger requests are clamped.
pub const MAX_CHANNEL_CAPACITY: usize = Semaphore::MAX_PERMITS;

/// Upper bound for the event bus ring buffer, which is allocated up front.
const MAX_BUS_CAPACITY: usize = 1 << 20;

/// Global configuration for a broker instance.
///
/// ## Field semantics
/// - `queue_capacity`: intake buffer used when a queue is created with size `0`
/// - `delivery_capacity`: per-subscriber delivery buffer (min 1)
/// - `bus_capacity`: runtime event bus ring buffer size (min 1)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// Default intake capacity of a queue.
    ///
    /// Used whenever `create_queue` is called with a buffer size of `0`.
    /// Once the intake is full, `put` waits until the dispatch loop drains a slot.
    pub queue_capacity: usize,

    /// Capacity of each subscriber's delivery channel.
    ///
    /// The default of `1` keeps delivery single-slot: a subscriber whose consumer
    /// is not reading stalls fan-out for the whole queue, and eventually `put`.
    pub delivery_capacity: usize,

    /// Capacity of the runtime event bus broadcast channel.
    ///
    /// Observers that lag behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,
}

impl BrokerConfig {
    /// Resolves the intake capacity for a queue created with `requested` slots.
    ///
    /// - `0` → [`Self::queue_capacity`] (clamped to at least 1)
    /// - `n > 0` → `n`
    ///
    /// The result never exceeds [`MAX_CHANNEL_CAPACITY`].
    #[inline]
    pub fn intake_capacity(&self, requested: usize) -> usize {
        let slots = match requested {
            0 => self.queue_capacity.max(1),
            n => n,
        };
        slots.min(MAX_CHANNEL_CAPACITY)
    }

    /// Returns the delivery capacity clamped to `1..=MAX_CHANNEL_CAPACITY`.
    #[inline]
    pub fn delivery_capacity_clamped(&self) -> usize {
        self.delivery_capacity.clamp(1, MAX_CHANNEL_CAPACITY)
    }

    /// Returns a bus capacity clamped to `1..=2^20`.
    ///
    /// The `Bus` should use this value to avoid constructing an invalid channel.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.clamp(1, MAX_BUS_CAPACITY)
    }
}

impl Default for BrokerConfig {
    /// Default configuration:
    ///
    /// - `queue_capacity = 100`
    /// - `delivery_capacity = 1` (single-slot delivery)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            delivery_capacity: 1,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_request_uses_default() {
        let cfg = BrokerConfig::default();
        assert_eq!(cfg.intake_capacity(0), 100);
        assert_eq!(cfg.intake_capacity(10), 10);
    }

    #[test]
    fn test_zero_config_values_are_clamped() {
        let cfg = BrokerConfig {
            queue_capacity: 0,
            delivery_capacity: 0,
            bus_capacity: 0,
        };
        assert_eq!(cfg.intake_capacity(0), 1);
        assert_eq!(cfg.delivery_capacity_clamped(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn test_oversized_capacities_are_capped() {
        let cfg = BrokerConfig {
            queue_capacity: usize::MAX,
            delivery_capacity: usize::MAX,
            bus_capacity: usize::MAX,
        };
        assert_eq!(cfg.intake_capacity(usize::MAX), MAX_CHANNEL_CAPACITY);
        assert_eq!(cfg.intake_capacity(0), MAX_CHANNEL_CAPACITY);
        assert_eq!(cfg.delivery_capacity_clamped(), MAX_CHANNEL_CAPACITY);
        assert_eq!(cfg.bus_capacity_clamped(), MAX_BUS_CAPACITY);
    }
}
