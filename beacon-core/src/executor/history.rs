//! Bounded ring buffer of [`HistoryEntry`] (spec §3/§4.4 "Audit history").

use std::collections::VecDeque;

use beacon_protocol::HistoryEntry;
use tokio::sync::Mutex;

pub struct HistoryRing {
    capacity: usize,
    entries: Mutex<VecDeque<HistoryEntry>>,
}

impl HistoryRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Appends one entry, evicting the oldest if the ring is at capacity.
    pub async fn push(&self, entry: HistoryEntry) {
        let mut entries = self.entries.lock().await;
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Returns the most recent `min(limit, len)` entries, oldest first.
    pub async fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let entries = self.entries.lock().await;
        let len = entries.len();
        let skip = len.saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(command: &str) -> HistoryEntry {
        HistoryEntry {
            command: command.to_string(),
            args: vec![],
            started_at_unix_ms: 0,
            duration_ms: 0,
            exit_code: 0,
            workdir: None,
        }
    }

    #[tokio::test]
    async fn evicts_oldest_once_full() {
        let ring = HistoryRing::new(2);
        ring.push(entry("a")).await;
        ring.push(entry("b")).await;
        ring.push(entry("c")).await;

        let recent = ring.recent(10).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].command, "b");
        assert_eq!(recent[1].command, "c");
    }

    #[tokio::test]
    async fn recent_respects_limit_and_order() {
        let ring = HistoryRing::new(100);
        for c in ["a", "b", "c"] {
            ring.push(entry(c)).await;
        }
        let recent = ring.recent(2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].command, "b");
        assert_eq!(recent[1].command, "c");
    }
}
