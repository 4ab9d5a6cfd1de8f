use std::collections::VecDeque;

use tracing::debug;

// Oldest first; never holds more than cap entries
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    cap: usize,
}

impl<T> History<T> {
    pub fn new(cap: usize) -> Self {
        Self { entries: VecDeque::new(), cap: cap.max(1) }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    // Returns how many of the oldest entries were dropped to fit the new cap
    pub fn set_cap(&mut self, cap: usize) -> usize {
        self.cap = cap.max(1);
        self.evict_overflow()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Returns how many entries were evicted
    pub fn push(&mut self, entry: T) -> usize {
        self.entries.push_back(entry);
        self.evict_overflow()
    }

    fn evict_overflow(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.cap {
            self.entries.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.entries.front()
    }

    // 0 is the newest; past the oldest clamps to the oldest
    pub fn ago(&self, ticks_ago: usize) -> Option<&T> {
        let len = self.entries.len();
        if ticks_ago >= len && len > 0 {
            debug!(ticks_ago, retained = len, "History lookup clamped to oldest entry");
        }
        let index = len.saturating_sub(ticks_ago.saturating_add(1));
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }
}
