//! # Subscriber handlers.
//!
//! This module provides the handler types driven by a subscriber's consume loop:
//! - [`Handler`] - trait for async per-value processing
//! - [`HandlerFn`] - closure-based handler implementation

mod handler;
mod handler_fn;

pub use handler::Handler;
pub use handler_fn::HandlerFn;
