// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Gap detection and tracking for Reliable QoS
//!
//! Reader-side receive history for one matched writer. Builds the
//! `SequenceNumberSet` a reader sends back in ACKNACK.

use std::collections::BTreeMap;
use std::ops::Range;

use super::{SequenceNumber, SequenceNumberSet};

/// Outcome of recording a received sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Next expected number; contiguous history advanced.
    InOrder,
    /// New, but ahead of a hole.
    OutOfOrder,
    /// Already received or declared lost.
    Duplicate,
}

/// Gap tracker for detecting missing sequence numbers
///
/// State is the highest number `H` such that every number `<= H` was
/// received or declared irrelevant, plus the numbers settled above `H`,
/// kept as coalesced half-open ranges so a wide GAP costs one entry.
///
/// # Algorithm
///
/// On `on_receive(seq)`:
/// 1. If `seq <= H` or already settled -> duplicate
/// 2. If `seq == H + 1` -> advance `H`, absorbing settled successors
/// 3. Otherwise -> record `seq` (a gap `[H+1..seq)` exists)
///
/// # Example
///
/// ```rust
/// use hdds_reliability::{GapTracker, SequenceNumber};
///
/// let sn = SequenceNumber::from_u64;
/// let mut tracker = GapTracker::new();
/// tracker.on_receive(sn(1));
/// tracker.on_receive(sn(4));
/// let missing: Vec<_> = tracker.missing_set(sn(4)).iter().collect();
/// assert_eq!(missing, vec![sn(2), sn(3)]);
/// ```
#[derive(Debug, Clone)]
pub struct GapTracker {
    highest_contiguous: SequenceNumber,
    /// start -> end (exclusive); disjoint, never adjacent, all above `H + 1`.
    ahead: BTreeMap<SequenceNumber, SequenceNumber>,
}

impl GapTracker {
    /// Tracker expecting sequence number 1 first.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_after(SequenceNumber::new(0, 0))
    }

    /// Tracker for which everything up to `highest_contiguous` is settled.
    #[must_use]
    pub fn starting_after(highest_contiguous: SequenceNumber) -> Self {
        Self {
            highest_contiguous,
            ahead: BTreeMap::new(),
        }
    }

    /// Process received sequence number.
    pub fn on_receive(&mut self, seq: SequenceNumber) -> ReceiveOutcome {
        let expected = self.highest_contiguous + 1;
        if seq < expected {
            return ReceiveOutcome::Duplicate;
        }
        if seq == expected {
            self.highest_contiguous = seq;
            self.absorb();
            return ReceiveOutcome::InOrder;
        }
        if self.settled_ahead(seq) {
            return ReceiveOutcome::Duplicate;
        }
        self.insert_ahead(seq..seq + 1);
        ReceiveOutcome::OutOfOrder
    }

    /// Mark `[start, end)` as irrelevant (writer sent GAP, or the numbers
    /// fell below the writer's `first_sn`).
    pub fn mark_lost(&mut self, lost: Range<SequenceNumber>) {
        if lost.start >= lost.end || lost.end <= self.highest_contiguous + 1 {
            return;
        }

        if lost.start <= self.highest_contiguous + 1 {
            self.highest_contiguous = lost.end - 1;
            self.absorb();
            return;
        }

        self.insert_ahead(lost);
    }

    /// Merge `range` into `ahead`, coalescing overlapping and adjacent runs.
    fn insert_ahead(&mut self, range: Range<SequenceNumber>) {
        let (mut start, mut end) = (range.start, range.end);
        if let Some((&prev_start, &prev_end)) = self.ahead.range(..=start).next_back() {
            if prev_end >= start {
                start = prev_start;
                end = end.max(prev_end);
            }
        }
        let merged: Vec<SequenceNumber> = self.ahead.range(start..=end).map(|(&s, _)| s).collect();
        for key in merged {
            if let Some(run_end) = self.ahead.remove(&key) {
                end = end.max(run_end);
            }
        }
        self.ahead.insert(start, end);
    }

    fn absorb(&mut self) {
        while let Some(entry) = self.ahead.first_entry() {
            let next = self.highest_contiguous + 1;
            if *entry.key() > next {
                break;
            }
            let end = entry.remove();
            if end > next {
                self.highest_contiguous = end - 1;
            }
        }
    }

    fn settled_ahead(&self, seq: SequenceNumber) -> bool {
        self.ahead
            .range(..=seq)
            .next_back()
            .is_some_and(|(_, &end)| seq < end)
    }

    /// Highest number below which nothing is missing.
    #[must_use]
    pub fn highest_contiguous(&self) -> SequenceNumber {
        self.highest_contiguous
    }

    /// True if `seq` was received or declared irrelevant.
    #[must_use]
    pub fn is_settled(&self, seq: SequenceNumber) -> bool {
        seq <= self.highest_contiguous || self.settled_ahead(seq)
    }

    /// Numbers settled ahead of the contiguous history.
    #[must_use]
    pub fn out_of_order_count(&self) -> u64 {
        self.ahead
            .iter()
            .map(|(&start, &end)| (end - start).to_u64())
            .sum()
    }

    /// Missing numbers in `[H+1, last_available]` as an ACKNACK set.
    ///
    /// The base is always `H + 1`, so the set also acknowledges everything
    /// below it. Holes beyond the 256-slot window are reported on a later
    /// round once the base has advanced.
    #[must_use]
    pub fn missing_set(&self, last_available: SequenceNumber) -> SequenceNumberSet {
        let base = self.highest_contiguous + 1;
        let mut set = SequenceNumberSet::new(base);
        if last_available < base {
            return set;
        }
        let window_last = base + (SequenceNumberSet::MAX_BITS - 1);
        let limit = last_available.min(window_last);

        let mut cursor = base;
        for (&start, &end) in self.ahead.range(..=limit) {
            set.add_range(cursor, start);
            cursor = end;
        }
        if cursor <= limit {
            set.add_range(cursor, limit + 1);
        }
        set
    }

    /// Missing numbers as half-open ranges (for logging and metrics).
    #[must_use]
    pub fn pending_gaps(&self) -> Vec<Range<SequenceNumber>> {
        let mut gaps = Vec::new();
        let mut cursor = self.highest_contiguous + 1;
        for (&start, &end) in &self.ahead {
            if start > cursor {
                gaps.push(cursor..start);
            }
            cursor = end;
        }
        gaps
    }
}

impl Default for GapTracker {
    fn default() -> Self {
        Self::new()
    }
}
