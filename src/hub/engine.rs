//! Hub engine
//!
//! This module contains the broadcast hub actor responsible for:
//! - keeping the bounded history of recent events
//! - keeping the registry of live subscriber feeds
//! - handing out subscriptions (history snapshot + live feed)
//! - fanning every published event out to all feeds in publish order
//!
//! Concurrency and usage notes:
//! - `Hub` owns all state and runs as a single task. Nothing else can reach
//!   history or registry; callers talk to it through a cloneable `HubHandle`
//!   over three bounded request channels (subscribe, unsubscribe, publish).
//! - Requests are handled one at a time, so taking a snapshot and registering
//!   the feed is one step: no event can slip between the two.
//! - Pending unsubscribes are served first, then publishes, then subscribes.
//!   A caller that queues a request and then another one on a different
//!   channel sees them handled in that order, e.g. events it published are in
//!   the snapshot of its next subscribe, and nothing published after its
//!   cancel reaches the cancelled feed. A steady stream of publishes delays
//!   new subscribers until the publish queue runs dry.
//! - Delivery blocks on a full feed. One consumer that stops draining stalls
//!   the whole hub until it catches up; a warning is logged when that
//!   happens. Feeds whose receiver was dropped are pruned instead.

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::HubSettings;
use crate::utils::error::HubError;

use super::event::Event;
use super::history::History;
use super::registry::{FeedId, Registry};
use super::subscription::Subscription;

/// Default depth of each subscriber's live feed.
pub const DEFAULT_FEED_CAPACITY: usize = 10;

/// Default depth of each inbound request queue.
pub const DEFAULT_REQUEST_CAPACITY: usize = 10;

type SubscribeRequest = oneshot::Sender<Subscription>;

pub struct Hub {
    history: History,
    registry: Registry,
    feed_capacity: usize,
    subscribe_rx: mpsc::Receiver<SubscribeRequest>,
    unsubscribe_rx: mpsc::Receiver<FeedId>,
    publish_rx: mpsc::Receiver<Event>,
    // Weak so the unsubscribe channel closes once every handle and
    // subscription is gone.
    unsubscribe_tx: mpsc::WeakSender<FeedId>,
}

/// Cloneable entry point to a running [`Hub`].
#[derive(Debug, Clone)]
pub struct HubHandle {
    subscribe_tx: mpsc::Sender<SubscribeRequest>,
    unsubscribe_tx: mpsc::Sender<FeedId>,
    publish_tx: mpsc::Sender<Event>,
}

impl Hub {
    /// Build a hub and the handle used to reach it. The hub does nothing
    /// until [`Hub::run`] is polled.
    pub fn new(settings: &HubSettings) -> (Self, HubHandle) {
        let request_capacity = settings.request_capacity.max(1);
        let (subscribe_tx, subscribe_rx) = mpsc::channel(request_capacity);
        let (unsubscribe_tx, unsubscribe_rx) = mpsc::channel(request_capacity);
        let (publish_tx, publish_rx) = mpsc::channel(request_capacity);

        let hub = Self {
            history: History::new(settings.history_capacity),
            registry: Registry::new(),
            feed_capacity: settings.feed_capacity.max(1),
            subscribe_rx,
            unsubscribe_rx,
            publish_rx,
            unsubscribe_tx: unsubscribe_tx.downgrade(),
        };
        let handle = HubHandle {
            subscribe_tx,
            unsubscribe_tx,
            publish_tx,
        };

        (hub, handle)
    }

    /// Spawn a hub on the current tokio runtime.
    pub fn spawn(settings: &HubSettings) -> HubHandle {
        let (hub, handle) = Self::new(settings);
        tokio::spawn(hub.run());
        handle
    }

    /// Serve requests until every handle and subscription has been dropped.
    pub async fn run(mut self) {
        info!(
            history_capacity = self.history.capacity(),
            feed_capacity = self.feed_capacity,
            "Hub started"
        );

        loop {
            tokio::select! {
                biased;

                Some(id) = self.unsubscribe_rx.recv() => self.unsubscribe(id),
                Some(event) = self.publish_rx.recv() => self.publish(event).await,
                Some(reply) = self.subscribe_rx.recv() => self.subscribe(reply),
                else => break,
            }
        }

        info!("Hub stopped");
    }

    fn subscribe(&mut self, reply: SubscribeRequest) {
        let Some(unsubscribe_tx) = self.unsubscribe_tx.upgrade() else {
            return;
        };

        let archive = self.history.snapshot();
        let archived = archive.len();
        let (feed_tx, feed_rx) = mpsc::channel(self.feed_capacity);
        let id = self.registry.insert(feed_tx);

        if reply
            .send(Subscription::new(archive, id, feed_rx, unsubscribe_tx))
            .is_err()
        {
            // Caller stopped waiting; nobody will ever read this feed.
            self.registry.remove(id);
            debug!(feed = %id, "Subscriber left before registration completed");
            return;
        }

        debug!(
            feed = %id,
            archived,
            subscribers = self.registry.len(),
            "Subscribed"
        );
    }

    fn unsubscribe(&mut self, id: FeedId) {
        if self.registry.remove(id) {
            debug!(feed = %id, subscribers = self.registry.len(), "Unsubscribed");
        }
    }

    async fn publish(&mut self, event: Event) {
        self.history.push(event.clone());

        let mut closed = Vec::new();
        for (id, feed) in self.registry.iter() {
            match feed.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(event)) => {
                    warn!(feed = %id, "Feed is full, hub blocked until it drains");
                    if feed.send(event).await.is_err() {
                        closed.push(id);
                    }
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        for id in closed {
            self.registry.remove(id);
            debug!(feed = %id, "Pruned feed with dropped receiver");
        }

        debug!(
            kind = ?event.kind,
            actor = %event.actor,
            subscribers = self.registry.len(),
            "Published"
        );
    }
}

impl HubHandle {
    /// Register a new subscriber, waiting for the hub's reply.
    pub async fn subscribe(&self) -> Result<Subscription, HubError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.subscribe_tx
            .send(reply_tx)
            .await
            .map_err(|_| HubError::Closed)?;
        reply_rx.await.map_err(|_| HubError::Closed)
    }

    /// Queue removal of a feed. Unknown feeds are ignored by the hub.
    pub async fn unsubscribe(&self, id: FeedId) -> Result<(), HubError> {
        self.unsubscribe_tx
            .send(id)
            .await
            .map_err(|_| HubError::Closed)
    }

    /// Queue an event for fan-out. Returns once queued, not once delivered.
    pub async fn publish(&self, event: Event) -> Result<(), HubError> {
        self.publish_tx
            .send(event)
            .await
            .map_err(|_| HubError::Closed)
    }

    pub async fn record_join(&self, actor: impl Into<String>) -> Result<(), HubError> {
        self.publish(Event::join(actor)).await
    }

    pub async fn record_message(
        &self,
        actor: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<(), HubError> {
        self.publish(Event::message(actor, text)).await
    }

    pub async fn record_leave(&self, actor: impl Into<String>) -> Result<(), HubError> {
        self.publish(Event::leave(actor)).await
    }
}
