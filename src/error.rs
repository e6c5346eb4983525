//! Error types used by the broker and by subscriber handlers.
//!
//! This module defines two error enums:
//!
//! - [`BrokerError`] - errors returned by broker operations that address a queue by name.
//! - [`HandlerError`] - outcomes of a subscriber handler that did not succeed.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//!
//! Handler errors never travel back to the publisher: the consume loop reports
//! them as runtime events and moves on to the next value.

use std::any::Any;

use thiserror::Error;

/// # Errors produced by broker operations.
///
/// `QueueNotFound` is raised by every operation that addresses an unregistered
/// queue name (publish, subscribe, remove-subscriber) and has no side effects.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// No queue is registered under this name.
    #[error("queue `{queue}` not found")]
    QueueNotFound {
        /// The name that was looked up.
        queue: String,
    },

    /// The broker has been closed; the operation was not applied.
    ///
    /// Also returned to a `put` that was blocked on a full intake when the
    /// broker shut down.
    #[error("broker closed; queue `{queue}` no longer accepts operations")]
    Closed {
        /// The queue the operation addressed.
        queue: String,
    },
}

impl BrokerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use embedq::BrokerError;
    ///
    /// let err = BrokerError::QueueNotFound { queue: "orders".into() };
    /// assert_eq!(err.as_label(), "queue_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::QueueNotFound { .. } => "queue_not_found",
            BrokerError::Closed { .. } => "broker_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BrokerError::QueueNotFound { queue } => format!("not found: queue={queue}"),
            BrokerError::Closed { queue } => format!("closed: queue={queue}"),
        }
    }

    /// Returns the queue name the failed operation addressed.
    pub fn queue(&self) -> &str {
        match self {
            BrokerError::QueueNotFound { queue } | BrokerError::Closed { queue } => queue,
        }
    }

    pub(crate) fn not_found(queue: &str) -> Self {
        BrokerError::QueueNotFound {
            queue: queue.to_string(),
        }
    }

    pub(crate) fn closed(queue: &str) -> Self {
        BrokerError::Closed {
            queue: queue.to_string(),
        }
    }
}

/// # Errors produced by subscriber handlers.
///
/// A failed handler invocation is reported and then forgotten: there is no
/// retry and the next value is handled normally.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler rejected or failed to process a value.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The handler panicked; the panic was caught by the consume loop.
    #[error("handler panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`].
    ///
    /// # Example
    /// ```
    /// use embedq::HandlerError;
    ///
    /// let err = HandlerError::fail("bad payload");
    /// assert_eq!(err.as_label(), "handler_failed");
    /// assert_eq!(err.to_string(), "handler failed: bad payload");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        HandlerError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Panicked { .. } => "handler_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::Fail { error } => format!("error: {error}"),
            HandlerError::Panicked { info } => format!("panic: {info}"),
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_info(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_error_labels() {
        let nf = BrokerError::not_found("orders");
        assert_eq!(nf.as_label(), "queue_not_found");
        assert_eq!(nf.queue(), "orders");
        assert_eq!(nf.to_string(), "queue `orders` not found");

        let closed = BrokerError::closed("orders");
        assert_eq!(closed.as_label(), "broker_closed");
        assert_eq!(closed.as_message(), "closed: queue=orders");
    }

    #[test]
    fn test_handler_error_messages() {
        let fail = HandlerError::fail("boom");
        assert_eq!(fail.as_message(), "error: boom");

        let panicked = HandlerError::Panicked {
            info: "index out of bounds".into(),
        };
        assert_eq!(panicked.as_label(), "handler_panicked");
        assert_eq!(panicked.to_string(), "handler panicked: index out of bounds");
    }

    #[test]
    fn test_panic_info_downcasts() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_info(&*payload), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_info(&*payload), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_info(&*payload), "unknown panic");
    }
}
