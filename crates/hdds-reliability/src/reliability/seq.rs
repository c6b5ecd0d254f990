// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sequence numbers for Reliable QoS
//!
//! RTPS carries sequence numbers as a `(high: i32, low: u32)` pair. The
//! logical value is `(high << 32) + low`; every arithmetic operation here
//! propagates at most one carry/borrow from `low` into `high`, so wrapping
//! of the low word is never observable as a decrease.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::INITIAL_SEQUENCE_NUMBER;

/// Encoded size of a sequence number on the wire (high + low).
pub const SEQUENCE_NUMBER_LEN: usize = 8;

/// RTPS sequence number (`SequenceNumber_t`).
///
/// Ordering is lexicographic on `(high, low)`, which the derived `Ord`
/// provides through field order.
///
/// # Example
///
/// ```rust
/// use hdds_reliability::SequenceNumber;
///
/// let last_low = SequenceNumber::new(0, u32::MAX);
/// let next = last_low + 1;
/// assert_eq!(next, SequenceNumber::new(1, 0));
/// assert!(last_low < next);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SequenceNumber {
    pub high: i32,
    pub low: u32,
}

impl SequenceNumber {
    /// Build from explicit high/low words.
    #[must_use]
    pub const fn new(high: i32, low: u32) -> Self {
        Self { high, low }
    }

    /// `SEQUENCENUMBER_UNKNOWN` (-1, 0): "no information" marker.
    ///
    /// Never use it as an ordering participant.
    #[must_use]
    pub const fn unknown() -> Self {
        Self { high: -1, low: 0 }
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }

    /// True for values a peer may legitimately send: `high` is
    /// non-negative and below `i32::MAX`, so window arithmetic on a
    /// received number (`sn + 256`, `base - 1`) never overflows.
    #[must_use]
    pub const fn is_wire_valid(&self) -> bool {
        self.high >= 0 && self.high < i32::MAX
    }

    /// Split a 64-bit value into high/low words.
    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self {
            high: (value >> 32) as i32,
            low: value as u32,
        }
    }

    /// Logical 64-bit value. Negative `high` (only `unknown`) maps to a
    /// negative number.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        ((self.high as i64) << 32) + self.low as i64
    }

    /// Logical value as `u64`. Meaningful for valid (non-negative) numbers.
    #[must_use]
    pub const fn to_u64(&self) -> u64 {
        self.as_i64() as u64
    }

    /// `++seq`: bump by one, carrying into `high` when `low` wraps.
    pub fn increment(&mut self) {
        if self.low == u32::MAX {
            self.low = 0;
            self.high += 1;
        } else {
            self.low += 1;
        }
    }

    /// Component-wise difference `self - subtrahend` with a single borrow.
    ///
    /// `self >= subtrahend` is a precondition (debug-asserted). In release
    /// builds a violation yields a bounded but meaningless value.
    #[must_use]
    pub fn difference(self, subtrahend: SequenceNumber) -> SequenceNumber {
        debug_assert!(
            self >= subtrahend,
            "sequence number difference underflow: {} - {}",
            self,
            subtrahend
        );
        let (low, borrow) = self.low.overflowing_sub(subtrahend.low);
        let high = self
            .high
            .wrapping_sub(subtrahend.high)
            .wrapping_sub(i32::from(borrow));
        SequenceNumber { high, low }
    }

    /// Append little-endian wire form (high, low) to `buf`.
    pub fn write_le(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.high.to_le_bytes());
        buf.extend_from_slice(&self.low.to_le_bytes());
    }

    /// Decode wire form; `little_endian` follows the submessage E flag.
    #[must_use]
    pub fn read(buf: &[u8], little_endian: bool) -> Option<Self> {
        let bytes = buf.get(..SEQUENCE_NUMBER_LEN)?;
        let high: [u8; 4] = bytes[0..4].try_into().ok()?;
        let low: [u8; 4] = bytes[4..8].try_into().ok()?;
        if little_endian {
            Some(Self::new(i32::from_le_bytes(high), u32::from_le_bytes(low)))
        } else {
            Some(Self::new(i32::from_be_bytes(high), u32::from_be_bytes(low)))
        }
    }
}

impl From<u32> for SequenceNumber {
    fn from(low: u32) -> Self {
        Self { high: 0, low }
    }
}

impl AddAssign<u32> for SequenceNumber {
    fn add_assign(&mut self, inc: u32) {
        let old_low = self.low;
        self.low = self.low.wrapping_add(inc);
        if self.low < old_low {
            self.high += 1;
        }
    }
}

impl Add<u32> for SequenceNumber {
    type Output = SequenceNumber;

    fn add(mut self, inc: u32) -> SequenceNumber {
        self += inc;
        self
    }
}

impl SubAssign<u32> for SequenceNumber {
    fn sub_assign(&mut self, dec: u32) {
        if dec > self.low {
            self.high -= 1;
        }
        self.low = self.low.wrapping_sub(dec);
    }
}

impl Sub<u32> for SequenceNumber {
    type Output = SequenceNumber;

    fn sub(mut self, dec: u32) -> SequenceNumber {
        self -= dec;
        self
    }
}

impl Sub<SequenceNumber> for SequenceNumber {
    type Output = SequenceNumber;

    fn sub(self, rhs: SequenceNumber) -> SequenceNumber {
        self.difference(rhs)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "unknown")
        } else {
            write!(f, "{}", self.as_i64())
        }
    }
}

/// Sequence number generator (per-writer)
///
/// Hands out monotonically increasing numbers, never reusing one.
/// All methods are lock-free (`fetch_add` on an `AtomicU64`), so several
/// threads may write through the same writer.
#[derive(Debug)]
pub struct SeqNumGenerator {
    initial: u64,
    next: AtomicU64,
}

impl SeqNumGenerator {
    /// Starts at 1 (RTPS sequence numbers start at 1, not 0).
    #[must_use]
    pub fn new() -> Self {
        Self::with_initial(INITIAL_SEQUENCE_NUMBER)
    }

    /// Starts at an arbitrary value (e.g. resuming a persisted writer).
    #[must_use]
    pub fn with_initial(initial: u64) -> Self {
        Self {
            initial,
            next: AtomicU64::new(initial),
        }
    }

    /// Assign the next sequence number.
    #[inline]
    pub fn next(&self) -> SequenceNumber {
        // fetch_add returns the OLD value, which is the one to hand out
        SequenceNumber::from_u64(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number that the next call to `next()` will return.
    #[inline]
    #[must_use]
    pub fn current(&self) -> SequenceNumber {
        SequenceNumber::from_u64(self.next.load(Ordering::Relaxed))
    }

    /// Highest number handed out so far, `None` before the first `next()`.
    #[must_use]
    pub fn last_assigned(&self) -> Option<SequenceNumber> {
        let next = self.next.load(Ordering::Relaxed);
        if next <= self.initial {
            None
        } else {
            Some(SequenceNumber::from_u64(next - 1))
        }
    }
}

impl Default for SeqNumGenerator {
    fn default() -> Self {
        Self::new()
    }
}
