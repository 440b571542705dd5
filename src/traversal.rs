//! Breadth-first walk over a page tree.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::page_id::PageId;

/// Queue, visited set and per-page event log for one run.
///
/// Each id is yielded by [`next_page`](Self::next_page) at most once, no matter
/// how often it is enqueued, so cycles and duplicate links terminate.
#[derive(Debug, Default)]
pub struct TraversalState {
    queue: VecDeque<PageId>,
    visited: HashSet<PageId>,
    events: HashMap<PageId, String>,
}

impl TraversalState {
    pub fn new(root: PageId) -> Self {
        let mut state = Self::default();
        state.queue.push_back(root);
        state
    }

    /// Next unseen id in FIFO discovery order, marked visited on the way out.
    pub fn next_page(&mut self) -> Option<PageId> {
        while let Some(id) = self.queue.pop_front() {
            if self.visited.insert(id.clone()) {
                return Some(id);
            }
        }
        None
    }

    pub fn enqueue<I: IntoIterator<Item = PageId>>(&mut self, ids: I) {
        self.queue
            .extend(ids.into_iter().filter(|id| !self.visited.contains(id)));
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn record_event(&mut self, id: &PageId, event: impl Into<String>) {
        self.events.insert(id.clone(), event.into());
    }

    pub fn last_event(&self, id: &PageId) -> Option<&str> {
        self.events.get(id).map(String::as_str)
    }
}
