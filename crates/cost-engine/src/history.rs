//! Bounded snapshot history
//!
//! Ring buffer of validated snapshots in arrival order. The oldest snapshot
//! is evicted once capacity is reached; nothing is ever reordered or
//! de-duplicated.

use std::collections::VecDeque;
use std::collections::vec_deque::Iter;
use tradecost_core::OrderBookSnapshot;

/// Rolling history of order book snapshots
#[derive(Debug, Clone)]
pub struct HistoryStore {
    buffer: VecDeque<OrderBookSnapshot>,
    capacity: usize,
    /// Snapshots ever appended (not capped by capacity)
    total_appended: u64,
}

impl HistoryStore {
    /// Create a new history with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            total_appended: 0,
        }
    }

    /// Append a snapshot, evicting the oldest when full. O(1).
    pub fn append(&mut self, snapshot: OrderBookSnapshot) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(snapshot);
        self.total_appended += 1;
    }

    /// The most recent `n` snapshots in chronological order (fewer if history is shorter)
    pub fn window(&self, n: usize) -> Iter<'_, OrderBookSnapshot> {
        let start = self.buffer.len().saturating_sub(n);
        self.buffer.range(start..)
    }

    /// Snapshots `start..end` in chronological order, clamped to what exists
    pub fn range(&self, start: usize, end: usize) -> Iter<'_, OrderBookSnapshot> {
        let end = end.min(self.buffer.len());
        let start = start.min(end);
        self.buffer.range(start..end)
    }

    /// Number of snapshots currently held
    #[inline]
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshots ever appended, including evicted ones
    #[inline]
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    /// Snapshot at chronological index `i` (0 = oldest held)
    #[inline]
    pub fn get(&self, i: usize) -> Option<&OrderBookSnapshot> {
        self.buffer.get(i)
    }

    /// Most recent snapshot
    #[inline]
    pub fn latest(&self) -> Option<&OrderBookSnapshot> {
        self.buffer.back()
    }

    /// Snapshot before the most recent one
    #[inline]
    pub fn previous(&self) -> Option<&OrderBookSnapshot> {
        let len = self.buffer.len();
        if len < 2 {
            return None;
        }
        self.buffer.get(len - 2)
    }

    /// All held snapshots, oldest first
    pub fn iter(&self) -> Iter<'_, OrderBookSnapshot> {
        self.buffer.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use tradecost_core::PriceLevel;

    fn snap(seq: i64) -> OrderBookSnapshot {
        let ts = DateTime::<Utc>::from_timestamp_millis(seq).unwrap();
        OrderBookSnapshot::new(
            ts,
            vec![PriceLevel::new(99.0, 1.0)],
            vec![PriceLevel::new(101.0, 1.0)],
        )
    }

    fn seq(s: &OrderBookSnapshot) -> i64 {
        s.timestamp.timestamp_millis()
    }

    #[test]
    fn test_append_and_window_order() {
        let mut history = HistoryStore::new(10);
        for i in 0..5 {
            history.append(snap(i));
        }

        let window: Vec<i64> = history.window(3).map(seq).collect();
        assert_eq!(window, vec![2, 3, 4]);

        // Asking for more than exists returns everything
        let all: Vec<i64> = history.window(100).map(seq).collect();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_eviction_at_capacity() {
        let mut history = HistoryStore::new(2000);
        for i in 0..2001 {
            history.append(snap(i));
        }

        assert_eq!(history.size(), 2000);
        assert!(history.is_full());
        assert_eq!(history.total_appended(), 2001);
        // The very first snapshot is gone
        assert!(history.window(2000).all(|s| seq(s) != 0));
        assert_eq!(history.get(0).map(seq), Some(1));
        assert_eq!(history.latest().map(seq), Some(2000));
        assert_eq!(history.previous().map(seq), Some(1999));
    }

    #[test]
    fn test_range_clamps() {
        let mut history = HistoryStore::new(10);
        for i in 0..4 {
            history.append(snap(i));
        }
        let r: Vec<i64> = history.range(1, 99).map(seq).collect();
        assert_eq!(r, vec![1, 2, 3]);
        assert_eq!(history.range(5, 9).count(), 0);
    }

    #[test]
    fn test_duplicates_kept() {
        let mut history = HistoryStore::new(10);
        history.append(snap(7));
        history.append(snap(7));
        assert_eq!(history.size(), 2);
    }

    #[test]
    fn test_previous_needs_two() {
        let mut history = HistoryStore::new(10);
        assert!(history.latest().is_none());
        history.append(snap(1));
        assert!(history.previous().is_none());
    }
}
