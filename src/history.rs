//! Navigation history of destination jumps

use std::collections::VecDeque;

use crate::document::Destination;

/// Back/forward list of jump origins (like vim's jump list)
#[derive(Debug)]
pub struct JumpHistory {
    entries: VecDeque<Destination>,
    /// Index of the entry being shown while walking back; `None` at the head
    cursor: Option<usize>,
    capacity: usize,
}

impl JumpHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            cursor: None,
            capacity,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a position before jumping away from it. Forward entries are
    /// dropped when walking back and then jumping somewhere new.
    pub fn push(&mut self, location: Destination) {
        if let Some(pos) = self.cursor.take() {
            self.entries.truncate(pos + 1);
        }
        if self.entries.back() != Some(&location) {
            self.append(location);
        }
    }

    fn append(&mut self, location: Destination) {
        self.entries.push_back(location);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Step back. At the head, `current` is saved first so `forward` can
    /// return to it.
    pub fn back(&mut self, current: Option<Destination>) -> Option<Destination> {
        if self.cursor.is_none() {
            if let Some(loc) = current {
                if self.entries.back() != Some(&loc) {
                    self.append(loc);
                }
            }
        }

        let target = match self.cursor {
            None if self.entries.len() >= 2 => self.entries.len() - 2,
            Some(pos) if pos > 0 => pos - 1,
            _ => return None,
        };
        self.cursor = Some(target);
        self.entries.get(target).cloned()
    }

    pub fn forward(&mut self) -> Option<Destination> {
        let pos = self.cursor?;
        if pos + 1 < self.entries.len() {
            self.cursor = Some(pos + 1);
            if pos + 2 == self.entries.len() {
                // Back at the newest entry
                self.cursor = None;
            }
            self.entries.get(pos + 1).cloned()
        } else {
            self.cursor = None;
            None
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}
