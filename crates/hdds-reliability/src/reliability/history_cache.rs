// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! History cache for writer-side message retransmission
//!
//! Ring buffer of recently written samples. KEEP_LAST semantics: when the
//! depth is reached the oldest sample is evicted, and later requests for it
//! are answered with GAP.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::SequenceNumber;
use crate::config::DEFAULT_HISTORY_DEPTH;

/// Cache entry for a single written sample.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub seq: SequenceNumber,
    pub payload: Arc<[u8]>,
}

/// History cache for writer-side message retransmission.
///
/// Entries are kept in ascending sequence order (writers insert in order).
#[derive(Debug)]
pub struct HistoryCache {
    ring: Mutex<VecDeque<CacheEntry>>,
    depth: usize,
}

impl HistoryCache {
    /// KEEP_LAST cache of `depth` samples (at least one).
    #[must_use]
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            ring: Mutex::new(VecDeque::with_capacity(depth)),
            depth,
        }
    }

    /// Insert a sample; returns the evicted sequence number, if any.
    pub fn insert(&self, seq: SequenceNumber, payload: &[u8]) -> Option<SequenceNumber> {
        let mut ring = self.ring.lock();
        let evicted = if ring.len() >= self.depth {
            ring.pop_front().map(|e| e.seq)
        } else {
            None
        };
        if let Some(old) = evicted {
            log::trace!("[HistoryCache] evicted seq={} (depth={})", old, self.depth);
        }
        ring.push_back(CacheEntry {
            seq,
            payload: Arc::from(payload),
        });
        evicted
    }

    /// Look up a payload for retransmission.
    #[must_use]
    pub fn get(&self, seq: SequenceNumber) -> Option<Arc<[u8]>> {
        let ring = self.ring.lock();
        ring.binary_search_by(|entry| entry.seq.cmp(&seq))
            .ok()
            .map(|idx| Arc::clone(&ring[idx].payload))
    }

    /// Oldest sequence still available (HEARTBEAT firstSN).
    #[must_use]
    pub fn oldest_seq(&self) -> Option<SequenceNumber> {
        self.ring.lock().front().map(|e| e.seq)
    }

    /// Newest sequence stored (HEARTBEAT lastSN).
    #[must_use]
    pub fn newest_seq(&self) -> Option<SequenceNumber> {
        self.ring.lock().back().map(|e| e.seq)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Default for HistoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sn(v: u64) -> SequenceNumber {
        SequenceNumber::from_u64(v)
    }

    #[test]
    fn test_insert_and_get() {
        let cache = HistoryCache::new(4);
        cache.insert(sn(1), b"one");
        cache.insert(sn(2), b"two");
        assert_eq!(cache.get(sn(2)).as_deref(), Some(&b"two"[..]));
        assert!(cache.get(sn(3)).is_none());
        assert_eq!(cache.oldest_seq(), Some(sn(1)));
        assert_eq!(cache.newest_seq(), Some(sn(2)));
    }

    #[test]
    fn test_keep_last_evicts_oldest() {
        let cache = HistoryCache::new(2);
        assert_eq!(cache.insert(sn(1), b"a"), None);
        assert_eq!(cache.insert(sn(2), b"b"), None);
        assert_eq!(cache.insert(sn(3), b"c"), Some(sn(1)));
        assert!(cache.get(sn(1)).is_none());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.oldest_seq(), Some(sn(2)));
    }

    #[test]
    fn test_zero_depth_clamped() {
        let cache = HistoryCache::new(0);
        assert_eq!(cache.depth(), 1);
        assert!(cache.is_empty());
    }
}
