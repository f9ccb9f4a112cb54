//! # chathub
//!
//! `chathub` is a live broadcast hub for chat-style events. Sessions join,
//! post messages and leave; every event is fanned out to all connected
//! sessions in one global order, and newcomers first receive a bounded
//! snapshot of recent history.
//!
//! ## Core Modules
//!
//! - `hub`: the actor that owns history and the subscriber registry, and the
//!   `Event` / `Subscription` types it hands out.
//! - `client`: drives one session against the hub (join, say, leave).
//! - `config`: loads server, hub and logging settings.
//! - `transport`: the WebSocket server and its JSON frames.
//! - `utils`: error types and logging setup.

pub mod client;
pub mod config;
pub mod hub;
pub mod transport;
pub mod utils;
