//! The `transport` module connects remote clients to the hub over
//! WebSockets.
//!
//! It defines the JSON frames exchanged with clients and implements the
//! server: one task per connection driving a [`crate::client::Client`],
//! replaying history first and then relaying live events and inbound
//! messages.

pub mod message;
pub mod websocket;

pub use message::{ClientMessage, ServerMessage};
pub use websocket::{serve, start_websocket_server};
