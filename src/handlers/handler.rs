//! # Subscriber handler abstraction.
//!
//! A [`Handler`] processes one payload value delivered to a subscriber and
//! reports the outcome. The consume loop calls it once per received value,
//! in receipt order, and never retries a failed invocation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;

/// # Asynchronous per-value handler.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use embedq::{Handler, HandlerError};
///
/// struct Printer;
///
/// #[async_trait]
/// impl Handler<String> for Printer {
///     async fn handle(&self, value: String) -> Result<(), HandlerError> {
///         if value.is_empty() {
///             return Err(HandlerError::fail("empty message"));
///         }
///         println!("{value}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<T: Send + 'static>: Send + Sync + 'static {
    /// Processes one value.
    ///
    /// An `Err` is reported as a runtime event and does not stop consumption.
    async fn handle(&self, value: T) -> Result<(), HandlerError>;
}

#[async_trait]
impl<T, H> Handler<T> for Arc<H>
where
    T: Send + 'static,
    H: Handler<T> + ?Sized,
{
    async fn handle(&self, value: T) -> Result<(), HandlerError> {
        self.as_ref().handle(value).await
    }
}
