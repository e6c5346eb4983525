//! # Example: orders
//!
//! The canonical flow: one queue, two subscribers, one of them removed midway.
//!
//! Shows how to:
//! - Create a queue and attach subscribers before starting the broker.
//! - Drive each subscriber with [`Subscriber::consume`].
//! - Remove a subscriber at runtime and shut the broker down.
//!
//! ## Flow
//! ```text
//! create_queue("orders", 10)
//!   ├─► create_subscriber → A, B
//!   ├─► spawn Broker::start()
//!   ├─► put {1}, {2}          → A and B both print 1, 2
//!   ├─► remove_subscriber(A)  → A's consume loop ends
//!   ├─► put {3}               → only B prints 3
//!   └─► close()               → B's consume loop ends, start() returns
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example orders --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use embedq::{Broker, BrokerConfig, HandlerError, HandlerFn, LogWriter, Observe};

#[derive(Clone, Debug)]
struct Order {
    id: u32,
}

type Printed = std::future::Ready<Result<(), HandlerError>>;

fn printer(label: &'static str) -> HandlerFn<impl Fn(Order) -> Printed> {
    HandlerFn::new(move |order: Order| {
        println!("[{label}] order id={}", order.id);
        std::future::ready(Ok(()))
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let observers: Vec<Arc<dyn Observe>> = vec![Arc::new(LogWriter::new())];
    let broker = Broker::<Order>::builder(BrokerConfig::default())
        .with_observers(observers)
        .build();

    broker.create_queue("orders", 10);
    let a = broker.create_subscriber("orders")?;
    let b = broker.create_subscriber("orders")?;
    let a_id = a.id();

    let a_worker = tokio::spawn(a.consume(printer("A")));
    let b_worker = tokio::spawn(b.consume(printer("B")));

    let runner = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move { broker.start().await })
    };

    broker.put("orders", Order { id: 1 }).await?;
    broker.put("orders", Order { id: 2 }).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    broker.remove_subscriber("orders", a_id)?;
    let a_stats = a_worker.await?;
    println!("[A] done: {a_stats:?}");

    broker.put("orders", Order { id: 3 }).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    broker.close();
    let b_stats = b_worker.await?;
    println!("[B] done: {b_stats:?}");
    runner.await?;
    Ok(())
}
