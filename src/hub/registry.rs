//! Subscriber registry
//!
//! The registry maps each live feed's identity to the sending half of that
//! feed. Identities are minted by the hub in increasing order, so iteration
//! follows registration order. Removing an entry drops the hub's sender,
//! which closes the feed for its receiver.
//!
//! Concurrency note: only the hub task ever touches a `Registry`.

use std::collections::BTreeMap;
use std::fmt;

use tokio::sync::mpsc::Sender;

use super::event::Event;

/// Opaque identity of one subscriber feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeedId(u64);

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feed-{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    feeds: BTreeMap<FeedId, Sender<Event>>,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feed under a fresh identity.
    pub fn insert(&mut self, sender: Sender<Event>) -> FeedId {
        let id = FeedId(self.next_id);
        self.next_id += 1;
        self.feeds.insert(id, sender);
        id
    }

    /// Remove a feed. Unknown identities are ignored; returns whether
    /// anything was removed.
    pub fn remove(&mut self, id: FeedId) -> bool {
        self.feeds.remove(&id).is_some()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: FeedId) -> bool {
        self.feeds.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeedId, &Sender<Event>)> {
        self.feeds.iter().map(|(id, tx)| (*id, tx))
    }

    pub(crate) fn len(&self) -> usize {
        self.feeds.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}
