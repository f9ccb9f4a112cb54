//! Bounded event history
//!
//! `History` keeps the most recent events so late joiners can be handed a
//! snapshot before live delivery starts. It is strictly FIFO: appends go to
//! the back and, once full, exactly one entry is evicted from the front per
//! append.

use std::collections::VecDeque;

use super::event::Event;

/// Default number of events retained for new subscribers.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

#[derive(Debug)]
pub struct History {
    events: VecDeque<Event>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event, returning the evicted oldest entry if history was full.
    ///
    /// With a capacity of zero nothing is retained and the event itself is
    /// handed back.
    pub fn push(&mut self, event: Event) -> Option<Event> {
        if self.capacity == 0 {
            return Some(event);
        }

        let evicted = if self.events.len() >= self.capacity {
            self.events.pop_front()
        } else {
            None
        };
        self.events.push_back(event);
        evicted
    }

    /// Copy the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.iter().cloned().collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
