//! Wire protocol
//!
//! Frames are JSON objects tagged by a `type` field. The server sends every
//! hub event as an `event` frame whose remaining fields are the event itself
//! (`kind`, `actor`, `timestamp`, `text`, in that order), and `error` frames
//! for input it could not understand. Clients send `message` frames.

use serde::{Deserialize, Serialize};

use crate::hub::Event;

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "message")]
    Message { text: String },
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "event")]
    Event(Event),
    #[serde(rename = "error")]
    Error { message: String },
}

impl From<Event> for ServerMessage {
    fn from(event: Event) -> Self {
        ServerMessage::Event(event)
    }
}
