//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(T) -> Fut`, producing a fresh future per
//! delivered value. If the closure needs shared state, capture an `Arc<...>`
//! explicitly.
//!
//! ## Example
//! ```rust
//! use embedq::{HandlerError, HandlerFn};
//!
//! let handler = HandlerFn::new(|value: u32| async move {
//!     if value == 0 {
//!         return Err(HandlerError::fail("zero is not allowed"));
//!     }
//!     Ok(())
//! });
//! # let _ = handler;
//! ```

use std::future::Future;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::handlers::Handler;

/// Function-backed handler implementation.
#[derive(Debug, Clone)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Wraps a closure that creates a new future per value.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, F, Fut> Handler<T> for HandlerFn<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, value: T) -> Result<(), HandlerError> {
        (self.f)(value).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_closure_is_called_per_value() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let handler = HandlerFn::new(move |v: u32| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(v, Ordering::Relaxed);
                Ok::<(), HandlerError>(())
            }
        });

        handler.handle(2).await.unwrap();
        handler.handle(3).await.unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn test_error_is_returned_unchanged() {
        let handler = HandlerFn::new(|_: ()| async { Err::<(), _>(HandlerError::fail("nope")) });
        assert_eq!(handler.handle(()).await, Err(HandlerError::fail("nope")));
    }
}
