//! Most recent radar scan, shared with readers without recomputation.
//!
//! One writer publishes whole snapshots; readers load the current one
//! lock-free and keep it alive for as long as they hold the `Arc`.

use crate::scan::radar::RadarEntry;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Immutable result of one scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanSnapshot {
    /// 0 for the empty snapshot present before the first publish
    pub sequence: u64,
    pub taken_at: DateTime<Utc>,
    pub entries: Vec<RadarEntry>,
}

#[derive(Debug)]
pub struct SnapshotStore {
    current: ArcSwap<ScanSnapshot>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(ScanSnapshot {
                sequence: 0,
                taken_at: Utc::now(),
                entries: Vec::new(),
            }),
        }
    }

    /// Replace the current snapshot. Meant for a single writer.
    pub fn publish(&self, entries: Vec<RadarEntry>) -> Arc<ScanSnapshot> {
        let sequence = self.current.load().sequence + 1;
        let snapshot = Arc::new(ScanSnapshot {
            sequence,
            taken_at: Utc::now(),
            entries,
        });

        // readers see the old or the new snapshot, never a mix
        self.current.store(Arc::clone(&snapshot));
        info!(sequence, entries = snapshot.entries.len(), "Scan snapshot published");
        snapshot
    }

    pub fn latest(&self) -> Arc<ScanSnapshot> {
        self.current.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::radar::ConfidenceTier;

    fn entry(symbol: &str) -> RadarEntry {
        RadarEntry {
            symbol: symbol.to_string(),
            category: "Index ETF".to_string(),
            signal: "LONG".to_string(),
            price: 100.0,
            stop_loss: 96.0,
            take_profit: 106.0,
            rr_ratio: 1.5,
            expected_roi_pct: 6.0,
            probability: 0.7,
            confidence_tier: ConfidenceTier::Medium,
            win_rate: 55.0,
            edge: 2.0,
            duration: "2-4 Días".to_string(),
        }
    }

    #[test]
    fn test_starts_empty() {
        let store = SnapshotStore::new();
        let snapshot = store.latest();
        assert_eq!(snapshot.sequence, 0);
        assert!(snapshot.entries.is_empty());
    }

    #[test]
    fn test_publish_replaces_and_keeps_old_readers_valid() {
        let store = SnapshotStore::new();
        store.publish(vec![entry("SPY")]);
        let held = store.latest();

        store.publish(vec![entry("QQQ"), entry("IWM")]);
        let latest = store.latest();

        assert_eq!(held.sequence, 1);
        assert_eq!(held.entries[0].symbol, "SPY");
        assert_eq!(latest.sequence, 2);
        assert_eq!(latest.entries.len(), 2);
    }

    #[test]
    fn test_concurrent_readers() {
        let store = Arc::new(SnapshotStore::new());
        store.publish(vec![entry("SPY")]);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.latest().entries.len())
            })
            .collect();

        for reader in readers {
            assert_eq!(reader.join().unwrap(), 1);
        }
    }
}
