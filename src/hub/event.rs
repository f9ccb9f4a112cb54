//! Event definitions for the hub
//!
//! `Event` is the single value type flowing through the hub: it is appended
//! to history, copied into snapshots and pushed onto every live feed. It is
//! also the wire representation sent to remote clients.
//!
//! Notes on fields:
//! - `kind`: what happened (`join`, `message` or `leave`)
//! - `actor`: identifier of the session that caused the event
//! - `timestamp`: seconds since UNIX epoch, stamped at creation
//! - `text`: message body; empty for joins and leaves

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Join,
    Message,
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub actor: String,
    pub timestamp: i64,
    pub text: String,
}

impl Event {
    /// Create an event stamped with the current wall-clock time.
    ///
    /// No validation is done on `actor` or `text`; empty strings are fine.
    pub fn new(kind: EventKind, actor: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            actor: actor.into(),
            timestamp: chrono::Utc::now().timestamp(),
            text: text.into(),
        }
    }

    pub fn join(actor: impl Into<String>) -> Self {
        Self::new(EventKind::Join, actor, String::new())
    }

    pub fn message(actor: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(EventKind::Message, actor, text)
    }

    pub fn leave(actor: impl Into<String>) -> Self {
        Self::new(EventKind::Leave, actor, String::new())
    }
}
