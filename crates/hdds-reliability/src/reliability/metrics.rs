// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metrics for Reliable QoS
//!
//! Tracks gap detection, heartbeat/ACKNACK traffic and retransmissions.

use std::sync::atomic::{AtomicU64, Ordering};

/// Reliable QoS metrics collector
///
/// Thread-safe atomic counters (Relaxed ordering, lock-free updates).
///
/// # Example
///
/// ```rust
/// use hdds_reliability::ReliableMetrics;
///
/// let metrics = ReliableMetrics::new();
/// metrics.record_gap(2);
/// metrics.record_gap(5);
/// let snap = metrics.snapshot();
/// assert_eq!(snap.gaps_detected, 2);
/// assert_eq!(snap.max_gap_size, 5);
/// ```
#[derive(Debug, Default)]
pub struct ReliableMetrics {
    gaps_detected: AtomicU64,
    max_gap_size: AtomicU64,
    out_of_order: AtomicU64,
    retransmit_sent: AtomicU64,
    retransmit_received: AtomicU64,
    acknacks_sent: AtomicU64,
    heartbeats_sent: AtomicU64,
    gaps_sent: AtomicU64,
}

/// Point-in-time copy of `ReliableMetrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub gaps_detected: u64,
    pub max_gap_size: u64,
    pub out_of_order: u64,
    pub retransmit_sent: u64,
    pub retransmit_received: u64,
    pub acknacks_sent: u64,
    pub heartbeats_sent: u64,
    pub gaps_sent: u64,
}

impl ReliableMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record gap detection (increment gaps_detected, update max_gap_size)
    pub fn record_gap(&self, gap_size: u64) {
        self.gaps_detected.fetch_add(1, Ordering::Relaxed);
        self.update_max_gap_size(gap_size);
    }

    /// Compare-exchange loop so only a larger size wins.
    fn update_max_gap_size(&self, new_size: u64) {
        let mut current = self.max_gap_size.load(Ordering::Relaxed);
        while new_size > current {
            match self.max_gap_size.compare_exchange_weak(
                current,
                new_size,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn increment_out_of_order(&self, count: u64) {
        self.out_of_order.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_retransmit_sent(&self, count: u64) {
        self.retransmit_sent.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_retransmit_received(&self, count: u64) {
        self.retransmit_received.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_acknacks_sent(&self, count: u64) {
        self.acknacks_sent.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_heartbeats_sent(&self, count: u64) {
        self.heartbeats_sent.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_gaps_sent(&self, count: u64) {
        self.gaps_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Load every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            gaps_detected: self.gaps_detected.load(Ordering::Relaxed),
            max_gap_size: self.max_gap_size.load(Ordering::Relaxed),
            out_of_order: self.out_of_order.load(Ordering::Relaxed),
            retransmit_sent: self.retransmit_sent.load(Ordering::Relaxed),
            retransmit_received: self.retransmit_received.load(Ordering::Relaxed),
            acknacks_sent: self.acknacks_sent.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            gaps_sent: self.gaps_sent.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_max_gap_size_concurrent() {
        let metrics = Arc::new(ReliableMetrics::new());
        let handles: Vec<_> = (1..=8u64)
            .map(|size| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || metrics.record_gap(size * 10))
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread panicked");
        }
        let snap = metrics.snapshot();
        assert_eq!(snap.gaps_detected, 8);
        assert_eq!(snap.max_gap_size, 80);
    }

    #[test]
    fn test_counters() {
        let metrics = ReliableMetrics::new();
        metrics.increment_heartbeats_sent(2);
        metrics.increment_acknacks_sent(1);
        metrics.increment_retransmit_sent(3);
        metrics.increment_gaps_sent(1);
        let snap = metrics.snapshot();
        assert_eq!(snap.heartbeats_sent, 2);
        assert_eq!(snap.acknacks_sent, 1);
        assert_eq!(snap.retransmit_sent, 3);
        assert_eq!(snap.gaps_sent, 1);
        assert_eq!(snap.out_of_order, 0);
    }
}
