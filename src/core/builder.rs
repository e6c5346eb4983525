use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::BrokerConfig;
use crate::observers::Observe;

use super::broker::Broker;

/// Builder for constructing a [`Broker`] with optional features.
pub struct BrokerBuilder<T> {
    cfg: BrokerConfig,
    observers: Vec<Arc<dyn Observe>>,
    _payload: PhantomData<fn() -> T>,
}

impl<T: Clone + Send + 'static> BrokerBuilder<T> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: BrokerConfig) -> Self {
        Self {
            cfg,
            observers: Vec::new(),
            _payload: PhantomData,
        }
    }

    /// Sets runtime event observers.
    ///
    /// Observers receive broker events (queue creation, detachments, handler
    /// failures, shutdown) through dedicated workers with bounded queues.
    /// Workers are spawned by `Broker::start()`; events published earlier are
    /// buffered on the bus up to `bus_capacity`.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observe>>) -> Self {
        self.observers = observers;
        self
    }

    /// Builds the broker. Does not require a tokio runtime.
    pub fn build(self) -> Arc<Broker<T>> {
        Arc::new(Broker::new_internal(self.cfg, self.observers))
    }
}
