//! # Observer lanes: per-observer delivery of broker events.
//!
//! [`ObserverSet`] owns one *lane* per observer: a bounded queue drained by a
//! dedicated worker task. The observer listener in `Broker::start()` pushes
//! every bus event into every lane without waiting.
//!
//! ```text
//! listener ── emit(ev) ──┬──► lane "log"     [cap] ──► worker ──► on_event()
//!                        └──► lane "metrics" [cap] ──► worker ──► on_event()
//!                                   │                      │
//!                               lane full             panic caught
//!                                   ▼                      ▼
//!                   ObserverOverflow{queue, subscriber}  ObserverPanicked
//! ```
//!
//! A full lane drops the event for that observer only. The overflow event keeps
//! the queue and subscriber of the lost event; it is itself never reported as
//! lost, so a saturated lane cannot feed back into the bus.
//!
//! `AssertUnwindSafe` is used around `on_event`: an observer that panics while
//! holding a lock can leave its own state inconsistent.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::panic_info;
use crate::events::{Bus, Event};
use crate::observers::Observe;

/// Sending side of one observer's lane.
struct Lane {
    observer: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Fan-out of broker events to observer workers.
pub(crate) struct ObserverSet {
    lanes: Vec<Lane>,
    workers: JoinSet<()>,
    bus: Bus,
}

impl ObserverSet {
    /// Opens one lane per observer and spawns its worker.
    ///
    /// Must be called inside a tokio runtime.
    pub(crate) fn new(observers: Vec<Arc<dyn Observe>>, bus: Bus) -> Self {
        let mut workers = JoinSet::new();
        let lanes = observers
            .into_iter()
            .map(|obs| {
                let (tx, rx) = mpsc::channel(obs.queue_capacity().max(1));
                let observer = obs.name();
                workers.spawn(drain_lane(obs, rx, bus.clone()));
                Lane { observer, tx }
            })
            .collect();

        Self { lanes, workers, bus }
    }

    /// Offers `event` to every lane without waiting.
    pub(crate) fn emit(&self, event: Event) {
        let event = Arc::new(event);

        for lane in &self.lanes {
            let reason = match lane.tx.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !event.is_observer_overflow() {
                self.bus
                    .publish(Event::observer_overflow(lane.observer, reason, &event));
            }
        }
    }

    /// Closes every lane and waits until each worker has drained its backlog.
    pub(crate) async fn shutdown(self) {
        let Self { lanes, mut workers, .. } = self;
        drop(lanes);
        while workers.join_next().await.is_some() {}
    }
}

/// Worker loop of one lane; a panicking `on_event` is reported and skipped.
async fn drain_lane(obs: Arc<dyn Observe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = rx.recv().await {
        if let Err(payload) = AssertUnwindSafe(obs.on_event(&ev)).catch_unwind().await {
            bus.publish(Event::observer_panicked(obs.name(), panic_info(&*payload)));
        }
    }
}
