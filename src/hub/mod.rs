//! The `hub` module is the core of `chathub`: a single actor that owns the
//! recent event history and the subscriber registry, and fans every
//! published event out to all live subscribers in one global order.

pub mod engine;
pub mod event;
pub mod history;
pub mod registry;
pub mod subscription;

pub use engine::{Hub, HubHandle};
pub use event::{Event, EventKind};
pub use registry::FeedId;
pub use subscription::Subscription;

#[cfg(test)]
mod tests;
