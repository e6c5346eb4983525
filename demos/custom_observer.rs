//! # Example: custom_observer
//!
//! Demonstrates how to build and attach a custom event observer.
//!
//! Shows how to:
//! - Implement the [`Observe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for handler failures and membership changes.
//! - Wire the observer into [`Broker::builder`].
//!
//! ## Flow
//! ```text
//! Broker::builder(cfg).with_observers([FailureCounter]).build()
//!     ├─► create_queue("jobs") ─► publish(QueueCreated)
//!     ├─► Broker::start()       ─► observer listener ─► ObserverSet ─► FailureCounter.on_event()
//!     ├─► consume loop          ─► handler error/panic ─► publish(HandlerFailed/HandlerPanicked)
//!     └─► close()               ─► publish(ShutdownRequested ... BrokerStopped)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_observer
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use embedq::{Broker, BrokerConfig, Event, EventKind, HandlerError, HandlerFn, Observe};

/// Counts handler failures and prints membership changes.
/// In real life, you could export metrics, ship logs, or trigger alerts.
#[derive(Default)]
struct FailureCounter {
    failures: AtomicU64,
}

#[async_trait::async_trait]
impl Observe for FailureCounter {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::HandlerFailed | EventKind::HandlerPanicked => {
                let n = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                println!(
                    "[obs] failure #{n}: queue={} subscriber={} reason={}",
                    ev.queue.as_deref().unwrap_or("<unknown>"),
                    ev.subscriber.map(|id| id.to_string()).unwrap_or_default(),
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::SubscriberAttached | EventKind::SubscriberDetached => {
                println!(
                    "[obs] {}: queue={} subscriber={}",
                    ev.kind.as_label(),
                    ev.queue.as_deref().unwrap_or("<unknown>"),
                    ev.subscriber.map(|id| id.to_string()).unwrap_or_default()
                );
            }
            EventKind::BrokerStopped => println!("[obs] broker stopped"),
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "failure-counter"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let counter = Arc::new(FailureCounter::default());
    let broker = Broker::<u32>::builder(BrokerConfig::default())
        .with_observers(vec![counter.clone() as Arc<dyn Observe>])
        .build();

    broker.create_queue("jobs", 0);
    let sub = broker.create_subscriber("jobs")?;
    let worker = tokio::spawn(sub.consume(HandlerFn::new(|job: u32| async move {
        match job % 3 {
            0 => Ok(()),
            1 => Err(HandlerError::fail(format!("job {job} rejected"))),
            _ => panic!("job {job} crashed"),
        }
    })));

    let runner = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move { broker.start().await })
    };

    for job in 0..6 {
        broker.put("jobs", job).await?;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    broker.close();
    let stats = worker.await?;
    runner.await?;

    println!(
        "consumed={} failed={} observed_failures={}",
        stats.received,
        stats.failed,
        counter.failures.load(Ordering::Relaxed)
    );
    Ok(())
}
