//! Process-wide kill log - append-only, bounded, shared by every arena

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::ws::protocol::KillLogEntry;

/// Default number of retained entries
pub const KILL_LOG_CAPACITY: usize = 256;

/// Append-only kill log. Only arena tasks append; anyone may read.
/// Lives for the whole process and is cleared only by a restart.
pub struct KillLog {
    entries: RwLock<VecDeque<KillLogEntry>>,
    next_seq: AtomicU64,
    capacity: usize,
}

impl KillLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            next_seq: AtomicU64::new(1),
            capacity,
        }
    }

    /// Append one kill, assigning its order token and timestamp.
    /// Returns the stored entry for broadcasting.
    pub fn append(
        &self,
        attacker_id: Uuid,
        attacker_name: &str,
        victim_id: Uuid,
        victim_name: &str,
    ) -> KillLogEntry {
        let entry = KillLogEntry {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            attacker_id,
            attacker_name: attacker_name.to_string(),
            victim_id,
            victim_name: victim_name.to_string(),
            timestamp: Utc::now(),
        };

        let mut entries = self.entries.write();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        entry
    }

    /// Most recent entries, newest first
    pub fn recent(&self, limit: usize) -> Vec<KillLogEntry> {
        self.entries
            .read()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for KillLog {
    fn default() -> Self {
        Self::new(KILL_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_assign_increasing_order_tokens() {
        let log = KillLog::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let first = log.append(a, "alpha", b, "bravo");
        let second = log.append(b, "bravo", a, "alpha");

        assert!(second.seq > first.seq);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn recent_returns_newest_first() {
        let log = KillLog::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        log.append(a, "alpha", b, "bravo");
        let latest = log.append(b, "bravo", a, "alpha");

        let recent = log.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].seq, latest.seq);
    }

    #[test]
    fn retention_is_bounded() {
        let log = KillLog::new(3);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        for _ in 0..10 {
            log.append(a, "alpha", b, "bravo");
        }
        assert_eq!(log.len(), 3);
        // Oldest entries were evicted
        assert_eq!(log.recent(3).last().unwrap().seq, 8);
    }
}
