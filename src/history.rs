//! Recent completed calculations, kept in memory only.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use crate::capture::CompletedCalculation;
use crate::narrate::narrate;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: u64,
    #[serde(flatten)]
    pub calculation: CompletedCalculation,
    pub divide_by_zero: bool,
    pub sentence: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct History {
    limit: usize,
    next_id: u64,
    entries: VecDeque<HistoryEntry>,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            next_id: 1,
            entries: VecDeque::new(),
        }
    }

    pub fn record(&mut self, calculation: CompletedCalculation) -> &HistoryEntry {
        let entry = HistoryEntry {
            id: self.next_id,
            calculation,
            divide_by_zero: calculation.is_divide_by_zero(),
            sentence: narrate(&calculation),
            timestamp: Utc::now(),
        };
        self.next_id += 1;
        self.entries.push_front(entry);
        self.entries.truncate(self.limit);
        &self.entries[0]
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        self.entries.truncate(self.limit);
    }

    /// Newest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Operator;

    fn add(a: u8, b: u8) -> CompletedCalculation {
        CompletedCalculation {
            first_operand: a,
            operator: Operator::Add,
            second_operand: b,
            result: f64::from(a + b),
        }
    }

    #[test]
    fn newest_first_and_bounded() {
        let mut h = History::new(3);
        for i in 1..=5 {
            h.record(add(i, 1));
        }
        assert_eq!(h.len(), 3);
        let ids: Vec<u64> = h.entries().map(|e| e.id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[test]
    fn entry_carries_narration() {
        let mut h = History::default();
        let e = h.record(add(2, 3));
        assert_eq!(e.sentence, "2 plus 3 equals 5");
        assert!(!e.divide_by_zero);
    }

    #[test]
    fn shrinking_the_limit_drops_oldest() {
        let mut h = History::new(5);
        for i in 1..=4 {
            h.record(add(i, i));
        }
        h.set_limit(2);
        let ids: Vec<u64> = h.entries().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 3]);
    }
}
