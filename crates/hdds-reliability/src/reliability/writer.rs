// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer-side reliability protocol handlers
//!
//! - HeartbeatTx: periodic heartbeat scheduling with jitter
//! - GapTx: GAP generation for numbers no longer in history
//! - WriterRetransmitHandler: ACKNACK processing and retransmission

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{GapMsg, HeartbeatMsg, HistoryCache, ReliableMetrics, SequenceNumber};
use crate::config::DEFAULT_HEARTBEAT_PERIOD_MS;
use crate::guid::{EntityId, ENTITYID_UNKNOWN_READER, ENTITYID_UNKNOWN_WRITER};
use crate::AckNackMsg;

// ============================================================================
// HEARTBEAT TX
// ============================================================================

/// Default jitter percentage (0-100).
pub const DEFAULT_JITTER_PCT: u8 = 10;

/// Heartbeat transmitter (writer-side).
///
/// The count starts at 1 and increases by one per heartbeat built, so
/// readers can discard stale or duplicated heartbeats.
#[derive(Debug)]
pub struct HeartbeatTx {
    next_deadline: Instant,
    period: Duration,
    jitter_pct: u8,
    count: u32,
}

impl HeartbeatTx {
    /// Create a transmitter with the default period (100 ms +/- 10%).
    #[must_use]
    pub fn new() -> Self {
        Self::with_period(
            Duration::from_millis(DEFAULT_HEARTBEAT_PERIOD_MS),
            DEFAULT_JITTER_PCT,
        )
    }

    #[must_use]
    pub fn with_period(period: Duration, jitter_pct: u8) -> Self {
        let jitter_pct = jitter_pct.min(100);
        Self {
            next_deadline: Instant::now() + Self::apply_jitter(period, jitter_pct),
            period,
            jitter_pct,
            count: 0,
        }
    }

    /// Next time the heartbeat should be sent.
    #[must_use]
    pub fn next_deadline(&self) -> Instant {
        self.next_deadline
    }

    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_deadline
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Build a heartbeat announcing `[first, last]` and schedule the next one.
    ///
    /// An empty history is announced as `first = last + 1`.
    pub fn build_heartbeat(
        &mut self,
        reader_id: EntityId,
        writer_id: EntityId,
        first: SequenceNumber,
        last: SequenceNumber,
    ) -> HeartbeatMsg {
        self.count = self.count.wrapping_add(1);
        self.next_deadline = Instant::now() + Self::apply_jitter(self.period, self.jitter_pct);
        HeartbeatMsg::new(reader_id, writer_id, first, last, self.count)
    }

    /// Push the deadline one period forward without building a heartbeat.
    pub fn reschedule(&mut self) {
        self.next_deadline = Instant::now() + Self::apply_jitter(self.period, self.jitter_pct);
    }

    /// Count of the last heartbeat built (0 before the first).
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    fn apply_jitter(period: Duration, jitter_pct: u8) -> Duration {
        if jitter_pct == 0 || period.is_zero() {
            return period;
        }
        // Uniform factor in [-pct, +pct] percent.
        let factor = fastrand::i32(-i32::from(jitter_pct)..=i32::from(jitter_pct));
        let base = period.as_secs_f64();
        let adjusted = base + base * f64::from(factor) / 100.0;
        Duration::from_secs_f64(adjusted.max(0.001))
    }
}

impl Default for HeartbeatTx {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// GAP TX
// ============================================================================

/// GAP transmitter (writer-side).
#[derive(Debug)]
pub struct GapTx {
    gap_count: u64,
    total_lost: u64,
    reader_id: EntityId,
    writer_id: EntityId,
}

impl GapTx {
    #[must_use]
    pub fn new() -> Self {
        Self::with_entity_ids(ENTITYID_UNKNOWN_READER, ENTITYID_UNKNOWN_WRITER)
    }

    #[must_use]
    pub fn with_entity_ids(reader_id: EntityId, writer_id: EntityId) -> Self {
        Self {
            gap_count: 0,
            total_lost: 0,
            reader_id,
            writer_id,
        }
    }

    /// Build one GAP per maximal contiguous run of `sequences`.
    ///
    /// Sequences must be sorted in ascending order.
    pub fn build_gap_from_sequences(&mut self, sequences: &[SequenceNumber]) -> Vec<GapMsg> {
        let mut messages = Vec::new();
        let mut iter = sequences.iter().copied().peekable();

        while let Some(start) = iter.next() {
            let mut end = start + 1;
            while iter.peek() == Some(&end) {
                iter.next();
                end.increment();
            }
            if let Some(msg) = GapMsg::contiguous(self.reader_id, self.writer_id, start..end) {
                self.gap_count += 1;
                self.total_lost += (end - start).to_u64();
                messages.push(msg);
            }
        }

        messages
    }

    /// Total GAP messages emitted.
    #[must_use]
    pub fn gap_count(&self) -> u64 {
        self.gap_count
    }

    /// Total sequence numbers announced as irrelevant.
    #[must_use]
    pub fn total_lost(&self) -> u64 {
        self.total_lost
    }
}

impl Default for GapTx {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// WRITER RETRANSMIT HANDLER
// ============================================================================

/// What a writer must send in reply to one ACKNACK.
#[derive(Debug, Default)]
pub struct RetransmitPlan {
    /// Samples still in history, ascending.
    pub retransmits: Vec<(SequenceNumber, Arc<[u8]>)>,
    /// GAPs for requested numbers that were evicted or never written.
    pub gaps: Vec<GapMsg>,
}

impl RetransmitPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.retransmits.is_empty() && self.gaps.is_empty()
    }
}

/// Writer-side retransmission handler.
pub struct WriterRetransmitHandler<'a> {
    cache: &'a HistoryCache,
    gap_tx: &'a mut GapTx,
    metrics: &'a ReliableMetrics,
}

impl<'a> WriterRetransmitHandler<'a> {
    pub fn new(
        cache: &'a HistoryCache,
        gap_tx: &'a mut GapTx,
        metrics: &'a ReliableMetrics,
    ) -> Self {
        Self {
            cache,
            gap_tx,
            metrics,
        }
    }

    /// Process an ACKNACK.
    ///
    /// # ACKNACK Processing
    ///
    /// ```text
    /// for seq in readerSNState:
    ///     cache hit  -> retransmit DATA
    ///     cache miss -> collect; GAP per contiguous run of misses
    /// ```
    pub fn on_acknack(&mut self, acknack: &AckNackMsg) -> RetransmitPlan {
        let mut plan = RetransmitPlan::default();
        let mut missing = Vec::new();

        for seq in acknack.reader_sn_state.iter() {
            match self.cache.get(seq) {
                Some(payload) => plan.retransmits.push((seq, payload)),
                None => missing.push(seq),
            }
        }

        if !missing.is_empty() {
            log::debug!(
                "[reliable] {} requested sample(s) unavailable, first={}",
                missing.len(),
                missing[0]
            );
            plan.gaps = self.gap_tx.build_gap_from_sequences(&missing);
            self.metrics.increment_gaps_sent(plan.gaps.len() as u64);
        }
        self.metrics
            .increment_retransmit_sent(plan.retransmits.len() as u64);

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SequenceNumberSet;

    fn sn(v: u64) -> SequenceNumber {
        SequenceNumber::from_u64(v)
    }

    #[test]
    fn test_heartbeat_count_monotonic() {
        let mut tx = HeartbeatTx::with_period(Duration::from_millis(50), 0);
        let a = tx.build_heartbeat(ENTITYID_UNKNOWN_READER, [0, 0, 1, 2], sn(1), sn(3));
        let b = tx.build_heartbeat(ENTITYID_UNKNOWN_READER, [0, 0, 1, 2], sn(1), sn(4));
        assert_eq!(a.count, 1);
        assert_eq!(b.count, 2);
        assert_eq!(tx.count(), 2);
    }

    #[test]
    fn test_jitter_bounds() {
        let period = Duration::from_millis(100);
        for _ in 0..100 {
            let d = HeartbeatTx::apply_jitter(period, 10);
            assert!(d >= Duration::from_millis(89) && d <= Duration::from_millis(111));
        }
        assert_eq!(HeartbeatTx::apply_jitter(period, 0), period);
    }

    #[test]
    fn test_gap_runs() {
        let mut gap_tx = GapTx::new();
        let gaps = gap_tx.build_gap_from_sequences(&[sn(2), sn(3), sn(4), sn(7)]);
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].lost_ranges(), vec![sn(2)..sn(5)]);
        assert_eq!(gaps[1].lost_ranges(), vec![sn(7)..sn(8)]);
        assert_eq!(gap_tx.gap_count(), 2);
        assert_eq!(gap_tx.total_lost(), 4);
    }

    #[test]
    fn test_retransmit_hits_and_misses() {
        let cache = HistoryCache::new(2);
        for v in 1..=4 {
            cache.insert(sn(v), &[v as u8]);
        }
        let metrics = ReliableMetrics::new();
        let mut gap_tx = GapTx::new();
        let mut handler = WriterRetransmitHandler::new(&cache, &mut gap_tx, &metrics);

        let set = SequenceNumberSet::from_sequences(sn(1), &[sn(1), sn(2), sn(4)])
            .expect("set in window");
        let plan = handler.on_acknack(&AckNackMsg::new(
            [0, 0, 1, 7],
            [0, 0, 1, 2],
            set,
            1,
        ));

        assert_eq!(plan.retransmits.len(), 1);
        assert_eq!(plan.retransmits[0].0, sn(4));
        assert_eq!(&*plan.retransmits[0].1, &[4u8]);
        assert_eq!(plan.gaps.len(), 1);
        assert_eq!(plan.gaps[0].lost_ranges(), vec![sn(1)..sn(3)]);

        let snap = metrics.snapshot();
        assert_eq!(snap.retransmit_sent, 1);
        assert_eq!(snap.gaps_sent, 1);
    }

    #[test]
    fn test_empty_acknack_is_noop() {
        let cache = HistoryCache::new(4);
        let metrics = ReliableMetrics::new();
        let mut gap_tx = GapTx::new();
        let mut handler = WriterRetransmitHandler::new(&cache, &mut gap_tx, &metrics);
        let plan = handler.on_acknack(&AckNackMsg::new(
            [0, 0, 1, 7],
            [0, 0, 1, 2],
            SequenceNumberSet::new(sn(5)),
            3,
        ));
        assert!(plan.is_empty());
    }
}
