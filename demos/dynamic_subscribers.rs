//! # Example: dynamic_subscribers
//!
//! Attach and remove subscribers while the broker is running, then stop on Ctrl-C.
//!
//! Demonstrates how to:
//! - Run the broker with [`Broker::run_until_signal`].
//! - From another async task ("controller"), attach subscribers over time and
//!   remove them again.
//! - Use [`Subscriber::recv`] directly instead of a handler.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► producer task: put("ticks", n) every 200ms
//!   ├─► controller task
//!   │     ├─► create_subscriber("ticks") → reader task (recv loop)
//!   │     ├─► sleep
//!   │     └─► remove_subscriber(...)     → reader's recv() returns None
//!   └─► run_until_signal()               → Ctrl-C → close()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example dynamic_subscribers
//! ```

use std::sync::Arc;
use std::time::Duration;

use embedq::{Broker, BrokerConfig, BrokerError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let broker = Broker::<u64>::new(BrokerConfig::default());
    broker.create_queue("ticks", 4);

    let producer = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move {
            let mut n = 0u64;
            loop {
                match broker.put("ticks", n).await {
                    Ok(()) => n += 1,
                    Err(BrokerError::Closed { .. }) => break,
                    Err(e) => {
                        eprintln!("[producer] {}", e.as_message());
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        })
    };

    let controller = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move {
            for round in 0..3u64 {
                let Ok(mut sub) = broker.create_subscriber("ticks") else {
                    return;
                };
                let id = sub.id();
                println!("[ctrl] attached {id} (round {round})");

                let reader = tokio::spawn(async move {
                    while let Some(tick) = sub.recv().await {
                        println!("[{id}] tick {tick}");
                    }
                    println!("[{id}] channel closed");
                });

                tokio::time::sleep(Duration::from_millis(700 + round * 300)).await;
                if broker.remove_subscriber("ticks", id).is_err() {
                    return;
                }
                let _ = reader.await;
            }
            println!("[ctrl] done, press Ctrl-C to exit");
        })
    };

    broker.run_until_signal().await?;
    let _ = producer.await;
    controller.abort();
    Ok(())
}
