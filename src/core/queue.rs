//! # Queue: intake channel, membership set and dispatch loop.
//!
//! A queue is split in two halves at creation:
//! - [`Queue`] is the shared half kept in the broker registry. It owns the
//!   sending side of the intake and of the leave-request channel and is used by
//!   `put`, `create_subscriber` and `remove_subscriber`.
//! - [`Dispatcher`] owns the receiving sides. It is parked on the broker's
//!   pending channel until `Broker::start()` spawns [`Dispatcher::run`].
//!
//! ## Dispatch loop
//! ```text
//! loop {
//!   select (biased) {
//!     shutdown token     → exit
//!     leave(id)          → members.remove(id)            → SubscriberDetached("removed")
//!     intake(value)      → for (id, tx) in snapshot(members):
//!                              tx.send(value.clone())     (waits while the slot is full)
//!                              ├─ closed    → members.remove(id) → SubscriberDetached("dropped")
//!                              └─ leave(id) while waiting → abandon this send
//!   }
//! }
//! ```
//!
//! ## Rules
//! - Attach inserts into `members` directly; every removal happens inside the loop.
//! - Per-subscriber FIFO: values reach each subscriber in intake order.
//! - A subscriber that stops reading stalls the fan-out for the whole queue and,
//!   once the intake is full, `put`.
//! - Shutdown cancels the queue token and clears `members`; the loop drops its
//!   snapshot on exit, which closes every delivery channel.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::subscriber::{Subscriber, SubscriberId};
use crate::error::BrokerError;
use crate::events::{Bus, Event, EventKind};

type Members<T> = Arc<DashMap<SubscriberId, mpsc::Sender<T>>>;

/// Shared half of a queue (registry side).
pub(crate) struct Queue<T> {
    name: Arc<str>,
    capacity: usize,
    delivery_capacity: usize,
    intake: mpsc::Sender<T>,
    leave: mpsc::UnboundedSender<SubscriberId>,
    members: Members<T>,
    token: CancellationToken,
    bus: Bus,
}

/// Owning half of a queue (dispatch side).
pub(crate) struct Dispatcher<T> {
    name: Arc<str>,
    intake: mpsc::Receiver<T>,
    leave: mpsc::UnboundedReceiver<SubscriberId>,
    members: Members<T>,
    token: CancellationToken,
    bus: Bus,
}

impl<T: Clone + Send + 'static> Queue<T> {
    /// Allocates both halves of a queue.
    ///
    /// `capacity` and `delivery_capacity` must already be resolved (>= 1).
    pub(crate) fn new(
        name: Arc<str>,
        capacity: usize,
        delivery_capacity: usize,
        token: CancellationToken,
        bus: Bus,
    ) -> (Arc<Self>, Dispatcher<T>) {
        let (intake_tx, intake_rx) = mpsc::channel(capacity);
        let (leave_tx, leave_rx) = mpsc::unbounded_channel();
        let members: Members<T> = Arc::new(DashMap::new());

        let queue = Arc::new(Self {
            name: Arc::clone(&name),
            capacity,
            delivery_capacity,
            intake: intake_tx,
            leave: leave_tx,
            members: Arc::clone(&members),
            token: token.clone(),
            bus: bus.clone(),
        });
        let dispatcher = Dispatcher {
            name,
            intake: intake_rx,
            leave: leave_rx,
            members,
            token,
            bus,
        };
        (queue, dispatcher)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.members.len()
    }

    /// Writes `value` into the intake, waiting while it is full.
    ///
    /// Returns `Closed` if the queue shuts down before the value is accepted.
    pub(crate) async fn put(&self, value: T) -> Result<(), BrokerError> {
        if self.token.is_cancelled() {
            return Err(BrokerError::closed(&self.name));
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(BrokerError::closed(&self.name)),
            res = self.intake.send(value) => res.map_err(|_| BrokerError::closed(&self.name)),
        }
    }

    /// Creates a subscriber and inserts it into the membership set.
    pub(crate) fn attach(&self) -> Result<Subscriber<T>, BrokerError> {
        if self.token.is_cancelled() {
            return Err(BrokerError::closed(&self.name));
        }
        let (tx, rx) = mpsc::channel(self.delivery_capacity);
        let id = SubscriberId::next();
        self.members.insert(id, tx);

        // close() may have cleared the set between the check and the insert.
        if self.token.is_cancelled() {
            self.members.remove(&id);
            return Err(BrokerError::closed(&self.name));
        }

        self.bus.publish(
            Event::now(EventKind::SubscriberAttached)
                .with_queue(Arc::clone(&self.name))
                .with_subscriber(id),
        );
        Ok(Subscriber::new(id, Arc::clone(&self.name), rx, self.bus.clone()))
    }

    /// Hands a removal request to the dispatch loop; never blocks.
    pub(crate) fn request_leave(&self, id: SubscriberId) -> Result<(), BrokerError> {
        if self.token.is_cancelled() {
            return Err(BrokerError::closed(&self.name));
        }
        self.leave
            .send(id)
            .map_err(|_| BrokerError::closed(&self.name))?;

        self.bus.publish(
            Event::now(EventKind::SubscriberRemoveRequested)
                .with_queue(Arc::clone(&self.name))
                .with_subscriber(id),
        );
        Ok(())
    }

    /// Stops the dispatch loop and drops every registered delivery sender.
    pub(crate) fn close(&self) {
        self.token.cancel();
        self.members.clear();
    }
}

impl<T: Clone + Send + 'static> Dispatcher<T> {
    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Runs the dispatch loop until the queue token is cancelled.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                Some(id) = self.leave.recv() => self.detach(id, "removed"),
                value = self.intake.recv() => match value {
                    Some(value) => {
                        if !self.fan_out(value).await {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        self.bus.publish(
            Event::now(EventKind::DispatchStopped).with_queue(Arc::clone(&self.name)),
        );
    }

    /// Delivers `value` to every current member; `false` if shutdown interrupted it.
    async fn fan_out(&mut self, value: T) -> bool {
        let targets: Vec<(SubscriberId, mpsc::Sender<T>)> = self
            .members
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        for (id, tx) in targets {
            // Removed earlier in this round while another send was waiting.
            if !self.members.contains_key(&id) {
                continue;
            }

            let send = tx.send(value.clone());
            tokio::pin!(send);

            loop {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => return false,
                    res = &mut send => {
                        if res.is_err() {
                            self.detach(id, "dropped");
                        }
                        break;
                    }
                    Some(leaving) = self.leave.recv() => {
                        self.detach(leaving, "removed");
                        if leaving == id {
                            break;
                        }
                    }
                }
            }
        }
        true
    }

    fn detach(&self, id: SubscriberId, reason: &'static str) {
        if self.members.remove(&id).is_some() {
            self.bus
                .publish(Event::subscriber_detached(Arc::clone(&self.name), id, reason));
        }
    }
}
