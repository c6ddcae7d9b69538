//! Round-robin endpoint selection.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin selector.
/// Stores an internal counter to rotate through equivalent endpoints.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next endpoint out of `len`, `None` when there are none.
    pub fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.counter.fetch_add(1, Ordering::Relaxed) % len)
    }

    /// Next endpoint together with its index.
    pub fn pick<'a, T>(&self, endpoints: &'a [T]) -> Option<(usize, &'a T)> {
        let index = self.next_index(endpoints.len())?;
        endpoints.get(index).map(|e| (index, e))
    }
}
