//! Shared types for the violation tracking service
//!
//! Holds the pieces used by both the server and its tests: the common error
//! type, configuration resolution, domain models, and the event bus that
//! backs realtime change notification.

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
