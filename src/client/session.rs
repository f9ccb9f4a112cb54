//! Session driver
//!
//! `Client` is one connected participant seen from the hub's side. It holds
//! the actor id, a hub handle and the subscription, and follows the session
//! contract: subscribe once, announce the join, relay messages, then announce
//! the leave and cancel on disconnect. It knows nothing about the network;
//! the transport drives it.

use tracing::info;
use uuid::Uuid;

use crate::hub::{Event, HubHandle, Subscription};
use crate::utils::error::HubError;

#[derive(Debug)]
pub struct Client {
    /// Actor identifier stamped on every event this client produces.
    pub id: String,
    hub: HubHandle,
    subscription: Subscription,
}

impl Client {
    /// Subscribe to the hub and announce the join under a fresh id.
    ///
    /// Returns the client together with the history snapshot, which should be
    /// replayed before any live event.
    pub async fn connect(hub: HubHandle) -> Result<(Self, Vec<Event>), HubError> {
        Self::connect_as(hub, format!("client-{}", Uuid::new_v4())).await
    }

    /// Like [`Client::connect`] with a caller-chosen id.
    pub async fn connect_as(
        hub: HubHandle,
        id: impl Into<String>,
    ) -> Result<(Self, Vec<Event>), HubError> {
        let id = id.into();
        let mut subscription = hub.subscribe().await?;
        let archive = std::mem::take(&mut subscription.archive);

        if let Err(e) = hub.record_join(id.as_str()).await {
            subscription.cancel().await;
            return Err(e);
        }

        info!(client = %id, feed = %subscription.id(), archived = archive.len(), "Client joined");

        Ok((
            Self {
                id,
                hub,
                subscription,
            },
            archive,
        ))
    }

    /// Publish a chat message from this client.
    pub async fn say(&self, text: impl Into<String>) -> Result<(), HubError> {
        self.hub.record_message(self.id.as_str(), text).await
    }

    /// Wait for the next live event. Cancel safe.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.subscription.recv().await
    }

    /// Announce the leave, then cancel the subscription.
    pub async fn disconnect(mut self) -> Result<(), HubError> {
        let result = self.hub.record_leave(self.id.as_str()).await;
        self.subscription.cancel().await;
        info!(client = %self.id, "Client left");
        result
    }
}
