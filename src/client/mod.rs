//! The `client` module defines a connected participant of the hub.
//!
//! It provides the `Client` struct, which drives one session against the hub
//! (join, messages, leave) independently of how the session reaches us.

pub mod session;
pub use session::Client;
