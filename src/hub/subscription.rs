//! Subscription handle
//!
//! A `Subscription` is what a caller gets back from the hub: the history as
//! it was at the moment of registration plus the receiving half of a private
//! feed carrying every event published afterwards.

use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::debug;

use super::event::Event;
use super::registry::FeedId;

#[derive(Debug)]
pub struct Subscription {
    /// Snapshot of history taken when the hub registered this feed, oldest
    /// first. Every event published later arrives on the feed instead.
    pub archive: Vec<Event>,
    id: FeedId,
    feed: mpsc::Receiver<Event>,
    unsubscribe: mpsc::Sender<FeedId>,
}

impl Subscription {
    pub(super) fn new(
        archive: Vec<Event>,
        id: FeedId,
        feed: mpsc::Receiver<Event>,
        unsubscribe: mpsc::Sender<FeedId>,
    ) -> Self {
        Self {
            archive,
            id,
            feed,
            unsubscribe,
        }
    }

    pub fn id(&self) -> FeedId {
        self.id
    }

    /// Wait for the next live event.
    ///
    /// Returns `None` once the hub has dropped this feed. Cancel safe.
    pub async fn recv(&mut self) -> Option<Event> {
        self.feed.recv().await
    }

    /// Take the next live event if one is already queued.
    pub fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        self.feed.try_recv()
    }

    /// Ask the hub to drop this feed, then discard whatever is already queued.
    ///
    /// Does not wait for the hub to process the request and never blocks on
    /// an empty feed. Safe to call more than once.
    pub async fn cancel(&mut self) {
        if self.unsubscribe.send(self.id).await.is_err() {
            debug!(feed = %self.id, "hub already stopped, nothing to unsubscribe from");
        }

        let mut drained = 0usize;
        while self.feed.try_recv().is_ok() {
            drained += 1;
        }

        debug!(feed = %self.id, drained, "subscription cancelled");
    }
}
