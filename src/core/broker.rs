//! # Broker: queue registry, lifecycle and routing.
//!
//! The [`Broker`] owns every named queue, the pending channel of dispatch loops
//! waiting to be launched, and the runtime event bus.
//!
//! ## Lifecycle
//! ```text
//!   Unstarted ──start()──► Running ──close()──► Closed
//!       │                                          ▲
//!       └──────────────────close()─────────────────┘
//!
//! create_queue(name) ──► registry.insert(name, Queue)
//!                    └─► pending.send(Dispatcher)
//!
//! start():
//!   ├─► spawn observer listener (Bus ─► ObserverSet)
//!   ├─► for each Dispatcher on pending: spawn Dispatcher::run()   (one loop per queue)
//!   │     └─ until the broker token is cancelled
//!   ├─► join every dispatch loop
//!   └─► publish BrokerStopped, flush observers, return
//!
//! close():
//!   ├─► publish ShutdownRequested
//!   ├─► cancel broker token  → every queue token (child) → loops exit, blocked puts return Closed
//!   └─► clear every membership set → delivery channels close → consume loops end
//! ```
//!
//! ## Rules
//! - A queue name, once registered, maps to the same queue for the broker's lifetime.
//! - `create_queue` is idempotent and never resets an existing subscriber set.
//! - Every name-addressed operation fails with `QueueNotFound` for unknown names,
//!   without side effects.
//! - Lookups clone the queue `Arc` before awaiting, so no registry lock is held
//!   while `put` waits on a full intake.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::BrokerConfig;
use crate::core::builder::BrokerBuilder;
use crate::core::queue::{Dispatcher, Queue};
use crate::core::shutdown;
use crate::core::subscriber::{Subscriber, SubscriberId};
use crate::error::BrokerError;
use crate::events::{Bus, Event, EventKind};
use crate::observers::{Observe, ObserverSet};

const UNSTARTED: u8 = 0;
const RUNNING: u8 = 1;
const CLOSED: u8 = 2;

/// Lifecycle state of a broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    /// Queues can be registered; no dispatch loop runs yet.
    Unstarted,
    /// `start()` is draining the pending channel.
    Running,
    /// `close()` was called. Terminal.
    Closed,
}

/// Observers plus the bus receiver created for them at construction.
type ObserverWiring = (Vec<Arc<dyn Observe>>, broadcast::Receiver<Event>);

/// Embedded publish/subscribe broker.
///
/// `T` is the payload type. It is cloned once per attached subscriber on fan-out;
/// wrap large payloads in `Arc` to keep that cheap.
pub struct Broker<T> {
    cfg: BrokerConfig,
    bus: Bus,
    queues: DashMap<String, Arc<Queue<T>>>,
    pending_tx: mpsc::UnboundedSender<Dispatcher<T>>,
    pending_rx: Mutex<Option<mpsc::UnboundedReceiver<Dispatcher<T>>>>,
    observers: Mutex<Option<ObserverWiring>>,
    state: AtomicU8,
    token: CancellationToken,
}

impl<T: Clone + Send + 'static> Broker<T> {
    /// Creates a broker without observers.
    pub fn new(cfg: BrokerConfig) -> Arc<Self> {
        Self::builder(cfg).build()
    }

    /// Returns a builder for a broker with observers.
    pub fn builder(cfg: BrokerConfig) -> BrokerBuilder<T> {
        BrokerBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: BrokerConfig, observers: Vec<Arc<dyn Observe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let (pending_tx, pending_rx) = mpsc::unbounded_channel();

        // Subscribe now so events published before start() are buffered for observers.
        let wiring = if observers.is_empty() {
            None
        } else {
            Some((observers, bus.subscribe()))
        };

        Self {
            cfg,
            bus,
            queues: DashMap::new(),
            pending_tx,
            pending_rx: Mutex::new(Some(pending_rx)),
            observers: Mutex::new(wiring),
            state: AtomicU8::new(UNSTARTED),
            token: CancellationToken::new(),
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> BrokerState {
        match self.state.load(Ordering::Acquire) {
            UNSTARTED => BrokerState::Unstarted,
            RUNNING => BrokerState::Running,
            _ => BrokerState::Closed,
        }
    }

    /// Registers a queue under `name`.
    ///
    /// - Existing name → no-op, returns `true` (the queue and its subscribers are untouched).
    /// - New name → allocates a queue with `buffer` intake slots (`0` → configured default)
    ///   and hands its dispatch loop to `start()`.
    /// - After `close()` → returns `false`.
    pub fn create_queue(&self, name: &str, buffer: usize) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        if self.queues.contains_key(name) {
            return true;
        }

        if let Entry::Vacant(slot) = self.queues.entry(name.to_string()) {
            let capacity = self.cfg.intake_capacity(buffer);
            let (queue, dispatcher) = Queue::new(
                Arc::from(name),
                capacity,
                self.cfg.delivery_capacity_clamped(),
                self.token.child_token(),
                self.bus.clone(),
            );
            slot.insert(queue);
            // The receiver lives until start() has finished, i.e. until shutdown.
            let _ = self.pending_tx.send(dispatcher);

            self.bus.publish(
                Event::now(EventKind::QueueCreated)
                    .with_queue(name)
                    .with_capacity(capacity),
            );
        }
        true
    }

    /// Publishes `value` to the queue `name`.
    ///
    /// Returns once the intake accepted the value (not once it was delivered),
    /// waiting while the intake is full.
    pub async fn put(&self, name: &str, value: T) -> Result<(), BrokerError> {
        let queue = self.lookup(name)?;
        queue.put(value).await
    }

    /// Attaches a new subscriber to the queue `name`.
    ///
    /// Membership is checked when a value is dispatched, not when it is put: the
    /// subscriber receives every value the dispatch loop fans out from now on,
    /// including values already waiting in the intake (e.g. put before `start()`).
    /// Values already fanned out are never replayed.
    pub fn create_subscriber(&self, name: &str) -> Result<Subscriber<T>, BrokerError> {
        self.lookup(name)?.attach()
    }

    /// Requests removal of a subscriber from the queue `name`.
    ///
    /// Removal is asynchronous: values fanned out before the dispatch loop picks up
    /// the request may still reach the subscriber. Unknown ids are ignored by the loop.
    pub fn remove_subscriber(
        &self,
        name: &str,
        subscriber: impl Into<SubscriberId>,
    ) -> Result<bool, BrokerError> {
        self.lookup(name)?.request_leave(subscriber.into())?;
        Ok(true)
    }

    /// Launches one dispatch loop per queue and runs until `close()`.
    ///
    /// Queues created while running get their loop as soon as they appear on the
    /// pending channel. Returns after every dispatch loop has exited and observers
    /// have been flushed. A second call returns immediately.
    pub async fn start(&self) {
        let Some(mut pending) = self.pending_rx.lock().await.take() else {
            return;
        };
        let _ = self
            .state
            .compare_exchange(UNSTARTED, RUNNING, Ordering::AcqRel, Ordering::Acquire);

        let flush = CancellationToken::new();
        let listener = self
            .observers
            .lock()
            .await
            .take()
            .map(|(observers, rx)| self.spawn_observer_listener(observers, rx, flush.clone()));

        let mut loops = JoinSet::new();
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                next = pending.recv() => match next {
                    Some(dispatcher) => {
                        self.bus.publish(
                            Event::now(EventKind::DispatchStarted)
                                .with_queue(Arc::clone(dispatcher.name())),
                        );
                        loops.spawn(dispatcher.run());
                    }
                    None => break,
                },
            }
        }
        drop(pending);

        while loops.join_next().await.is_some() {}

        self.bus.publish(Event::now(EventKind::BrokerStopped));
        flush.cancel();
        if let Some(listener) = listener {
            let _ = listener.await;
        }
    }

    /// Shuts the broker down. Idempotent.
    ///
    /// Ends every dispatch loop, closes every delivery channel (consume loops end),
    /// releases blocked `put` calls with `Closed`, and makes `start()` return.
    pub fn close(&self) {
        self.shutdown(None);
    }

    fn shutdown(&self, reason: Option<&'static str>) {
        if self.state.swap(CLOSED, Ordering::AcqRel) == CLOSED {
            return;
        }
        let mut ev = Event::now(EventKind::ShutdownRequested);
        if let Some(reason) = reason {
            ev = ev.with_reason(reason);
        }
        self.bus.publish(ev);
        self.token.cancel();

        for entry in self.queues.iter() {
            entry.value().close();
        }
    }

    /// Starts the broker, waits for a termination signal, then closes it.
    ///
    /// Returns once `start()` has finished, or the signal registration error.
    pub async fn run_until_signal(self: &Arc<Self>) -> std::io::Result<()> {
        let me = Arc::clone(self);
        let runner = tokio::spawn(async move { me.start().await });

        let res = shutdown::wait_for_shutdown_signal().await;
        self.shutdown(res.as_ref().ok().copied());
        let _ = runner.await;
        res.map(|_| ())
    }

    /// True if a queue is registered under `name`.
    pub fn has_queue(&self, name: &str) -> bool {
        self.queues.contains_key(name)
    }

    /// Returns the sorted list of registered queue names.
    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of subscribers currently attached to `name`.
    pub fn subscriber_count(&self, name: &str) -> Result<usize, BrokerError> {
        Ok(self.lookup(name)?.subscriber_count())
    }

    /// Returns the resolved intake capacity of `name`.
    pub fn queue_capacity(&self, name: &str) -> Result<usize, BrokerError> {
        Ok(self.lookup(name)?.capacity())
    }

    fn lookup(&self, name: &str) -> Result<Arc<Queue<T>>, BrokerError> {
        self.queues
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BrokerError::not_found(name))
    }

    /// Forwards bus events to the observer set until `flush` is cancelled and the
    /// receiver has been drained.
    fn spawn_observer_listener(
        &self,
        observers: Vec<Arc<dyn Observe>>,
        mut rx: broadcast::Receiver<Event>,
        flush: CancellationToken,
    ) -> JoinHandle<()> {
        let set = ObserverSet::new(observers, self.bus.clone());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(ev),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = flush.cancelled() => break,
                }
            }
            set.shutdown().await;
        })
    }
}

impl<T> Drop for Broker<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::timeout;

    use super::*;
    use crate::config::MAX_CHANNEL_CAPACITY;
    use crate::error::HandlerError;
    use crate::handlers::HandlerFn;

    const WAIT: Duration = Duration::from_secs(2);

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Order {
        id: u32,
    }

    fn spawn_start<T: Clone + Send + 'static>(broker: &Arc<Broker<T>>) -> JoinHandle<()> {
        let b = Arc::clone(broker);
        tokio::spawn(async move { b.start().await })
    }

    /// Consumes `sub` on a task, forwarding every value to the returned receiver.
    fn forward<T: Clone + Send + 'static>(
        sub: Subscriber<T>,
    ) -> (mpsc::UnboundedReceiver<T>, JoinHandle<crate::ConsumeStats>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(sub.consume(HandlerFn::new(move |v: T| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(v);
                Ok::<(), HandlerError>(())
            }
        })));
        (rx, worker)
    }

    async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Option<T> {
        timeout(WAIT, rx.recv()).await.ok().flatten()
    }

    #[tokio::test]
    async fn test_orders_scenario() {
        let broker = Broker::<Order>::new(BrokerConfig::default());
        assert!(broker.create_queue("orders", 10));
        let runner = spawn_start(&broker);

        let a = broker.create_subscriber("orders").unwrap();
        let a_id = a.id();
        let b = broker.create_subscriber("orders").unwrap();
        let (mut a_rx, a_worker) = forward(a);
        let (mut b_rx, b_worker) = forward(b);

        broker.put("orders", Order { id: 1 }).await.unwrap();
        broker.put("orders", Order { id: 2 }).await.unwrap();
        for id in [1, 2] {
            assert_eq!(next(&mut a_rx).await, Some(Order { id }));
            assert_eq!(next(&mut b_rx).await, Some(Order { id }));
        }

        assert_eq!(broker.remove_subscriber("orders", a_id), Ok(true));
        // A's consume loop ends once the dispatch loop processed the removal.
        let a_stats = timeout(WAIT, a_worker).await.unwrap().unwrap();
        assert_eq!(a_stats.received, 2);

        broker.put("orders", Order { id: 3 }).await.unwrap();
        assert_eq!(next(&mut b_rx).await, Some(Order { id: 3 }));
        assert_eq!(next(&mut a_rx).await, None);

        broker.close();
        let b_stats = timeout(WAIT, b_worker).await.unwrap().unwrap();
        assert_eq!(b_stats, crate::ConsumeStats { received: 3, failed: 0 });
        timeout(WAIT, runner).await.unwrap().unwrap();
        assert_eq!(broker.state(), BrokerState::Closed);
    }

    #[tokio::test]
    async fn test_create_queue_is_idempotent() {
        let broker = Broker::<u32>::new(BrokerConfig::default());
        assert!(broker.create_queue("q", 5));
        let _sub = broker.create_subscriber("q").unwrap();

        assert!(broker.create_queue("q", 50));
        assert_eq!(broker.queue_names(), vec!["q".to_string()]);
        assert_eq!(broker.queue_capacity("q"), Ok(5));
        assert_eq!(broker.subscriber_count("q"), Ok(1));
    }

    #[tokio::test]
    async fn test_zero_buffer_uses_configured_default() {
        let cfg = BrokerConfig {
            queue_capacity: 7,
            ..BrokerConfig::default()
        };
        let broker = Broker::<u32>::new(cfg);
        broker.create_queue("q", 0);
        assert_eq!(broker.queue_capacity("q"), Ok(7));
    }

    #[tokio::test]
    async fn test_unknown_queue_is_not_found_without_side_effects() {
        let broker = Broker::<u32>::new(BrokerConfig::default());
        let expected = BrokerError::not_found("missing");

        assert_eq!(broker.put("missing", 1).await, Err(expected.clone()));
        assert_eq!(
            broker.create_subscriber("missing").unwrap_err(),
            expected.clone()
        );
        assert_eq!(
            broker.remove_subscriber("missing", SubscriberId::next()),
            Err(expected)
        );
        assert!(!broker.has_queue("missing"));
        assert!(broker.queue_names().is_empty());
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_dispatched_values() {
        let broker = Broker::<u32>::new(BrokerConfig::default());
        broker.create_queue("q", 4);
        let mut early = broker.create_subscriber("q").unwrap();
        let runner = spawn_start(&broker);

        broker.put("q", 1).await.unwrap();
        assert_eq!(timeout(WAIT, early.recv()).await.unwrap(), Some(1));

        let mut late = broker.create_subscriber("q").unwrap();
        broker.put("q", 2).await.unwrap();
        assert_eq!(timeout(WAIT, late.recv()).await.unwrap(), Some(2));
        assert_eq!(timeout(WAIT, early.recv()).await.unwrap(), Some(2));

        broker.close();
        timeout(WAIT, runner).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_subscriber_attached_before_dispatch_gets_buffered_value() {
        let broker = Broker::<u32>::new(BrokerConfig::default());
        broker.create_queue("q", 4);
        broker.put("q", 1).await.unwrap();

        let mut sub = broker.create_subscriber("q").unwrap();
        let runner = spawn_start(&broker);
        assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), Some(1));

        broker.close();
        timeout(WAIT, runner).await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_keep_per_producer_order() {
        const PRODUCERS: u32 = 4;
        const PER_PRODUCER: u32 = 50;
        let total = (PRODUCERS * PER_PRODUCER) as usize;

        let broker = Broker::<u32>::new(BrokerConfig::default());
        broker.create_queue("q", 4);
        let readers: Vec<_> = (0..2)
            .map(|_| {
                let mut sub = broker.create_subscriber("q").unwrap();
                tokio::spawn(async move {
                    let mut got = Vec::with_capacity(total);
                    while got.len() < total {
                        match sub.recv().await {
                            Some(v) => got.push(v),
                            None => break,
                        }
                    }
                    got
                })
            })
            .collect();
        let runner = spawn_start(&broker);

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let b = Arc::clone(&broker);
                tokio::spawn(async move {
                    for i in 0..PER_PRODUCER {
                        b.put("q", p * 1000 + i).await.unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            timeout(WAIT, producer).await.unwrap().unwrap();
        }

        let expected: Vec<u32> = (0..PRODUCERS)
            .flat_map(|p| (0..PER_PRODUCER).map(move |i| p * 1000 + i))
            .collect();
        for reader in readers {
            let got = timeout(WAIT, reader).await.unwrap().unwrap();

            let mut sorted = got.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, expected, "every value exactly once");

            for p in 0..PRODUCERS {
                let mine: Vec<u32> = got.iter().copied().filter(|v| v / 1000 == p).collect();
                assert!(mine.windows(2).all(|w| w[0] < w[1]), "producer {p} reordered");
            }
        }

        broker.close();
        timeout(WAIT, runner).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_oversized_capacities_are_clamped() {
        let cfg = BrokerConfig {
            delivery_capacity: usize::MAX,
            ..BrokerConfig::default()
        };
        let broker = Broker::<u32>::new(cfg);
        assert!(broker.create_queue("q", usize::MAX));
        assert_eq!(broker.queue_capacity("q"), Ok(MAX_CHANNEL_CAPACITY));

        let mut sub = broker.create_subscriber("q").unwrap();
        let runner = spawn_start(&broker);
        broker.put("q", 5).await.unwrap();
        assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), Some(5));

        broker.close();
        timeout(WAIT, runner).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_values_buffered_before_start_are_delivered() {
        let broker = Broker::<u32>::new(BrokerConfig::default());
        broker.create_queue("q", 4);
        let mut sub = broker.create_subscriber("q").unwrap();
        broker.put("q", 1).await.unwrap();
        broker.put("q", 2).await.unwrap();
        assert_eq!(broker.state(), BrokerState::Unstarted);

        let runner = spawn_start(&broker);
        assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), Some(1));
        assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), Some(2));
        assert_eq!(broker.state(), BrokerState::Running);

        broker.close();
        timeout(WAIT, runner).await.unwrap().unwrap();
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_queue_created_while_running_gets_a_loop() {
        let broker = Broker::<u32>::new(BrokerConfig::default());
        let runner = spawn_start(&broker);

        broker.create_queue("late", 1);
        let mut sub = broker.create_subscriber("late").unwrap();
        broker.put("late", 9).await.unwrap();
        assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), Some(9));

        broker.close();
        timeout(WAIT, runner).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_close_releases_blocked_put() {
        let cfg = BrokerConfig {
            delivery_capacity: 1,
            ..BrokerConfig::default()
        };
        let broker = Broker::<u32>::new(cfg);
        broker.create_queue("q", 1);
        let _stalled = broker.create_subscriber("q").unwrap();
        let runner = spawn_start(&broker);

        // The stalled subscriber never reads: its slot fills, fan-out stalls, then the intake.
        let mut blocked_at = None;
        for v in 0..8 {
            if timeout(Duration::from_millis(100), broker.put("q", v)).await.is_err() {
                blocked_at = Some(v);
                break;
            }
        }
        assert!(blocked_at.is_some(), "put never blocked");

        let pending = {
            let b = Arc::clone(&broker);
            tokio::spawn(async move { b.put("q", 99).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        broker.close();

        assert_eq!(
            timeout(WAIT, pending).await.unwrap().unwrap(),
            Err(BrokerError::closed("q"))
        );
        timeout(WAIT, runner).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_close_before_start_ends_consumers_and_start() {
        let broker = Broker::<u32>::new(BrokerConfig::default());
        broker.create_queue("q", 1);
        let sub = broker.create_subscriber("q").unwrap();
        let (_rx, worker) = forward(sub);

        broker.close();
        broker.close();
        assert!(!broker.create_queue("other", 1));
        assert_eq!(broker.put("q", 1).await, Err(BrokerError::closed("q")));

        timeout(WAIT, broker.start()).await.unwrap();
        timeout(WAIT, worker).await.unwrap().unwrap();
        assert_eq!(broker.state(), BrokerState::Closed);
    }

    #[tokio::test]
    async fn test_second_start_returns_immediately() {
        let broker = Broker::<u32>::new(BrokerConfig::default());
        let runner = spawn_start(&broker);
        timeout(WAIT, async {
            while broker.state() != BrokerState::Running {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        timeout(WAIT, broker.start()).await.unwrap();
        assert!(!runner.is_finished());

        broker.close();
        timeout(WAIT, runner).await.unwrap().unwrap();
    }

    struct Recorder {
        tx: mpsc::UnboundedSender<Event>,
        seen: Arc<StdMutex<Vec<EventKind>>>,
    }

    #[async_trait]
    impl Observe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
            let _ = self.tx.send(event.clone());
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn test_handler_failures_reach_observers() {
        let (tx, mut events) = mpsc::unbounded_channel();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let broker = Broker::<u32>::builder(BrokerConfig::default())
            .with_observers(vec![Arc::new(Recorder {
                tx,
                seen: Arc::clone(&seen),
            })])
            .build();
        broker.create_queue("q", 4);
        let sub = broker.create_subscriber("q").unwrap();
        let sub_id = sub.id();
        let runner = spawn_start(&broker);

        let worker = tokio::spawn(sub.consume(HandlerFn::new(|v: u32| async move {
            if v % 2 == 1 {
                return Err(HandlerError::fail(format!("odd value {v}")));
            }
            Ok(())
        })));

        for v in 0..4 {
            broker.put("q", v).await.unwrap();
        }

        let mut failures = Vec::new();
        while failures.len() < 2 {
            let ev = timeout(WAIT, events.recv()).await.unwrap().unwrap();
            if ev.kind == EventKind::HandlerFailed {
                assert_eq!(ev.subscriber, Some(sub_id));
                failures.push(ev.reason.unwrap().to_string());
            }
        }
        assert_eq!(failures, vec!["error: odd value 1", "error: odd value 3"]);

        broker.close();
        let stats = timeout(WAIT, worker).await.unwrap().unwrap();
        assert_eq!(stats.failed, 2);
        timeout(WAIT, runner).await.unwrap().unwrap();

        // Observers are flushed before start() returns.
        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&EventKind::QueueCreated));
        assert_eq!(seen.last(), Some(&EventKind::BrokerStopped));
        assert!(seen.contains(&EventKind::ShutdownRequested));
    }
}
