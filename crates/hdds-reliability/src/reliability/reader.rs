// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reader-side reliability protocol handlers
//!
//! - HeartbeatRx: heartbeat freshness filtering and gap detection
//! - GapRx: GAP processing for irrelevant sequence numbers
//! - AckNackTx: ACKNACK generation from the receive history

use std::ops::Range;

use super::{AckNackMsg, GapMsg, GapTracker, HeartbeatMsg, SequenceNumber};
use crate::guid::EntityId;

// ============================================================================
// HEARTBEAT RX
// ============================================================================

/// Heartbeat receiver (reader-side).
#[derive(Debug, Default)]
pub struct HeartbeatRx {
    last_count: Option<u32>,
}

impl HeartbeatRx {
    #[must_use]
    pub fn new() -> Self {
        Self { last_count: None }
    }

    /// Apply a heartbeat to `tracker`.
    ///
    /// Returns `false` for stale or duplicated heartbeats (count not above
    /// the last one seen), which must be ignored entirely. Otherwise
    /// numbers below `first_sn` are marked lost, since the writer no longer
    /// has them.
    pub fn on_heartbeat(&mut self, hb: &HeartbeatMsg, tracker: &mut GapTracker) -> bool {
        if let Some(last_count) = self.last_count {
            if hb.count <= last_count {
                log::trace!(
                    "[reliable] stale heartbeat count={} last={}",
                    hb.count,
                    last_count
                );
                return false;
            }
        }
        self.last_count = Some(hb.count);

        let expected = tracker.highest_contiguous() + 1;
        if hb.first_sn > expected {
            tracker.mark_lost(expected..hb.first_sn);
        }
        true
    }

    /// Last heartbeat count seen.
    #[must_use]
    pub fn last_count(&self) -> Option<u32> {
        self.last_count
    }
}

// ============================================================================
// GAP RX
// ============================================================================

/// GAP receiver (reader-side).
#[derive(Debug, Default)]
pub struct GapRx {
    gap_count: u64,
    total_lost: u64,
}

impl GapRx {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ranges a GAP declares irrelevant, coalesced, ascending.
    pub fn on_gap(&mut self, gap: &GapMsg) -> Vec<Range<SequenceNumber>> {
        let ranges = gap.lost_ranges();
        self.gap_count += 1;
        self.total_lost += ranges
            .iter()
            .map(|r| (r.end - r.start).to_u64())
            .sum::<u64>();
        ranges
    }

    #[must_use]
    pub fn gap_count(&self) -> u64 {
        self.gap_count
    }

    #[must_use]
    pub fn total_lost(&self) -> u64 {
        self.total_lost
    }
}

// ============================================================================
// ACKNACK TX
// ============================================================================

/// ACKNACK transmitter (reader-side).
#[derive(Debug)]
pub struct AckNackTx {
    reader_id: EntityId,
    writer_id: EntityId,
    count: u32,
}

impl AckNackTx {
    #[must_use]
    pub fn new(reader_id: EntityId, writer_id: EntityId) -> Self {
        Self {
            reader_id,
            writer_id,
            count: 0,
        }
    }

    /// ACKNACK for everything missing up to `last_available`.
    ///
    /// The Final flag is set when nothing is missing (pure acknowledgement).
    pub fn build_acknack(
        &mut self,
        tracker: &GapTracker,
        last_available: SequenceNumber,
    ) -> AckNackMsg {
        let missing = tracker.missing_set(last_available);
        self.count = self.count.wrapping_add(1);
        let mut msg = AckNackMsg::new(self.reader_id, self.writer_id, missing, self.count);
        msg.final_flag = missing.is_empty();
        msg
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SequenceNumberSet;

    const READER: EntityId = [0, 0, 1, 0x07];
    const WRITER: EntityId = [0, 0, 1, 0x02];

    fn sn(v: u64) -> SequenceNumber {
        SequenceNumber::from_u64(v)
    }

    fn hb(first: u64, last: u64, count: u32) -> HeartbeatMsg {
        HeartbeatMsg::new(READER, WRITER, sn(first), sn(last), count)
    }

    #[test]
    fn test_stale_heartbeat_ignored() {
        let mut rx = HeartbeatRx::new();
        let mut tracker = GapTracker::new();
        assert!(rx.on_heartbeat(&hb(1, 5, 2), &mut tracker));
        assert!(!rx.on_heartbeat(&hb(1, 5, 2), &mut tracker));
        assert!(!rx.on_heartbeat(&hb(1, 6, 1), &mut tracker));
        assert_eq!(rx.last_count(), Some(2));
    }

    #[test]
    fn test_heartbeat_first_sn_marks_lost() {
        let mut rx = HeartbeatRx::new();
        let mut tracker = GapTracker::new();
        tracker.on_receive(sn(1));
        assert!(rx.on_heartbeat(&hb(4, 6, 1), &mut tracker));
        assert_eq!(tracker.highest_contiguous(), sn(3));
    }

    #[test]
    fn test_gap_rx_ranges() {
        let mut rx = GapRx::new();
        let list = SequenceNumberSet::from_sequences(sn(5), &[sn(6), sn(8)]).expect("set");
        let gap = GapMsg::new(READER, WRITER, sn(2), list);
        assert_eq!(rx.on_gap(&gap), vec![sn(2)..sn(5), sn(6)..sn(7), sn(8)..sn(9)]);
        assert_eq!(rx.gap_count(), 1);
        assert_eq!(rx.total_lost(), 5);
    }

    #[test]
    fn test_gap_rx_wide_range_single_entry() {
        let mut rx = GapRx::new();
        let end = sn(1 + (1u64 << 40));
        let gap = GapMsg::new(READER, WRITER, sn(1), SequenceNumberSet::new(end));
        assert_eq!(rx.on_gap(&gap), vec![sn(1)..end]);
        assert_eq!(rx.total_lost(), 1u64 << 40);

        let mut tracker = GapTracker::new();
        tracker.mark_lost(sn(1)..end);
        assert_eq!(tracker.highest_contiguous(), end - 1);
    }

    #[test]
    fn test_acknack_final_when_complete() {
        let mut tx = AckNackTx::new(READER, WRITER);
        let mut tracker = GapTracker::new();
        tracker.on_receive(sn(1));
        tracker.on_receive(sn(2));

        let ack = tx.build_acknack(&tracker, sn(2));
        assert!(ack.final_flag);
        assert_eq!(ack.reader_sn_state.base(), sn(3));
        assert_eq!(ack.count, 1);

        tracker.on_receive(sn(4));
        let nack = tx.build_acknack(&tracker, sn(5));
        assert!(!nack.final_flag);
        assert_eq!(nack.requested(), vec![sn(3), sn(5)]);
        assert_eq!(nack.count, 2);
    }
}
