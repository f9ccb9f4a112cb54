//! The `utils` module provides shared pieces used across `chathub`:
//! the error types and the logging setup.

pub mod error;
pub mod logging;

pub use error::{HubError, TransportError};
