// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS reliability protocol messages
//!
//! Submessage bodies used by Reliable QoS:
//! - DATA: Writer sample with its sequence number
//! - HEARTBEAT: Writer announces available sequence range
//! - ACKNACK: Reader acknowledges / requests retransmission
//! - GAP: Writer declares lost/unavailable sequences
//!
//! Bodies are always encoded little-endian; decoders honour the E flag.

use std::ops::Range;

use super::{SequenceNumber, SequenceNumberSet};
use crate::guid::{EntityId, ENTITY_ID_LEN};
use crate::protocol::constants::{CDR_LE_ENCAPSULATION, DATA_OCTETS_TO_INLINE_QOS};

// ============================================================================
// Decoding helpers
// ============================================================================

fn read_u16(buf: &[u8], offset: usize, le: bool) -> Option<u16> {
    let bytes: [u8; 2] = buf.get(offset..offset + 2)?.try_into().ok()?;
    Some(if le {
        u16::from_le_bytes(bytes)
    } else {
        u16::from_be_bytes(bytes)
    })
}

fn read_u32(buf: &[u8], offset: usize, le: bool) -> Option<u32> {
    let bytes: [u8; 4] = buf.get(offset..offset + 4)?.try_into().ok()?;
    Some(if le {
        u32::from_le_bytes(bytes)
    } else {
        u32::from_be_bytes(bytes)
    })
}

fn read_entity(buf: &[u8], offset: usize) -> Option<EntityId> {
    buf.get(offset..offset + ENTITY_ID_LEN)?.try_into().ok()
}

/// Numbers outside the wire range make the whole submessage invalid.
fn read_sn(buf: &[u8], offset: usize, le: bool) -> Option<SequenceNumber> {
    SequenceNumber::read(buf.get(offset..)?, le).filter(SequenceNumber::is_wire_valid)
}

fn write_sn_set(buf: &mut Vec<u8>, set: &SequenceNumberSet) {
    set.base().write_le(buf);
    buf.extend_from_slice(&set.num_bits().to_le_bytes());
    for word in set.bitmap_words() {
        buf.extend_from_slice(&word.to_le_bytes());
    }
}

/// Decode a SequenceNumberSet; returns the set and bytes consumed.
fn read_sn_set(buf: &[u8], offset: usize, le: bool) -> Option<(SequenceNumberSet, usize)> {
    let base = read_sn(buf, offset, le)?;
    let num_bits = read_u32(buf, offset + 8, le)?;
    let words_len = SequenceNumberSet::word_count_for_bits(num_bits.min(SequenceNumberSet::MAX_BITS));
    let mut words = Vec::with_capacity(words_len);
    for idx in 0..words_len {
        words.push(read_u32(buf, offset + 12 + idx * 4, le)?);
    }
    let set = SequenceNumberSet::from_raw(base, num_bits, &words)?;
    Some((set, 12 + words_len * 4))
}

// ============================================================================
// DATA
// ============================================================================

/// DATA submessage body (DDS-RTPS v2.5 Sec.8.3.7.2), no inline QoS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMsg {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub writer_sn: SequenceNumber,
    /// User payload without the encapsulation header.
    pub payload: Vec<u8>,
}

impl DataMsg {
    #[must_use]
    pub fn new(
        reader_id: EntityId,
        writer_id: EntityId,
        writer_sn: SequenceNumber,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            reader_id,
            writer_id,
            writer_sn,
            payload,
        }
    }

    /// Encode body; serialized payload is CDR_LE encapsulated and padded to 4.
    ///
    /// The padding count goes in the low bits of the encapsulation options
    /// (DDS-XTypes 7.6.3.1.2) so the decoder can strip it.
    #[must_use]
    pub fn encode_body(&self) -> Vec<u8> {
        let padding = (4 - self.payload.len() % 4) % 4;
        let mut buf = Vec::with_capacity(20 + 4 + self.payload.len() + padding);
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&DATA_OCTETS_TO_INLINE_QOS.to_le_bytes());
        buf.extend_from_slice(&self.reader_id);
        buf.extend_from_slice(&self.writer_id);
        self.writer_sn.write_le(&mut buf);
        let mut encapsulation = CDR_LE_ENCAPSULATION;
        encapsulation[3] = padding as u8;
        buf.extend_from_slice(&encapsulation);
        buf.extend_from_slice(&self.payload);
        buf.resize(buf.len() + padding, 0);
        buf
    }

    /// Decode only the writer sequence number (cheap path for filters).
    #[must_use]
    pub fn peek_writer_sn(body: &[u8], le: bool) -> Option<SequenceNumber> {
        read_sn(body, 12, le)
    }

    /// Decode body, stripping encapsulation header and alignment padding.
    #[must_use]
    pub fn decode_body(body: &[u8], le: bool) -> Option<Self> {
        let octets_to_inline_qos = usize::from(read_u16(body, 2, le)?);
        let reader_id = read_entity(body, 4)?;
        let writer_id = read_entity(body, 8)?;
        let writer_sn = read_sn(body, 12, le)?;

        // Payload follows inline QoS start (offset 4 + octetsToInlineQos);
        // inline QoS is never emitted by this crate.
        let payload_start = 4 + octets_to_inline_qos;
        let payload = match body.get(payload_start..) {
            Some(rest) if rest.len() >= 4 => {
                let padding = usize::from(rest[3] & 0x03);
                let data = &rest[4..];
                data[..data.len().saturating_sub(padding)].to_vec()
            }
            _ => Vec::new(),
        };

        Some(Self {
            reader_id,
            writer_id,
            writer_sn,
            payload,
        })
    }
}

// ============================================================================
// HEARTBEAT
// ============================================================================

/// Heartbeat message (RTPS HEARTBEAT submessage per DDS-RTPS v2.5 Sec.8.3.7.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatMsg {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    /// First (oldest) sequence number in writer's cache.
    pub first_sn: SequenceNumber,
    /// Last (newest) sequence number written by writer.
    pub last_sn: SequenceNumber,
    /// Monotonic heartbeat counter (anti-replay).
    pub count: u32,
    /// F flag: reader need not answer.
    pub final_flag: bool,
    /// L flag: heartbeat doubles as a liveliness assertion.
    pub liveliness_flag: bool,
}

impl HeartbeatMsg {
    /// Encoded body length.
    pub const BODY_LEN: usize = 28;

    #[must_use]
    pub fn new(
        reader_id: EntityId,
        writer_id: EntityId,
        first_sn: SequenceNumber,
        last_sn: SequenceNumber,
        count: u32,
    ) -> Self {
        Self {
            reader_id,
            writer_id,
            first_sn,
            last_sn,
            count,
            final_flag: false,
            liveliness_flag: false,
        }
    }

    #[must_use]
    pub fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::BODY_LEN);
        buf.extend_from_slice(&self.reader_id);
        buf.extend_from_slice(&self.writer_id);
        self.first_sn.write_le(&mut buf);
        self.last_sn.write_le(&mut buf);
        buf.extend_from_slice(&self.count.to_le_bytes());
        buf
    }

    /// Decode body; flag bits come from the submessage header.
    #[must_use]
    pub fn decode_body(body: &[u8], le: bool, final_flag: bool, liveliness_flag: bool) -> Option<Self> {
        Some(Self {
            reader_id: read_entity(body, 0)?,
            writer_id: read_entity(body, 4)?,
            first_sn: read_sn(body, 8, le)?,
            last_sn: read_sn(body, 16, le)?,
            count: read_u32(body, 24, le)?,
            final_flag,
            liveliness_flag,
        })
    }
}

// ============================================================================
// ACKNACK
// ============================================================================

/// ACKNACK message (reader -> writer, DDS-RTPS v2.5 Sec.8.3.7.1).
///
/// `reader_sn_state.base()` acknowledges everything below it; set bits
/// are the numbers the reader still needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckNackMsg {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub reader_sn_state: SequenceNumberSet,
    pub count: u32,
    pub final_flag: bool,
}

impl AckNackMsg {
    #[must_use]
    pub fn new(
        reader_id: EntityId,
        writer_id: EntityId,
        reader_sn_state: SequenceNumberSet,
        count: u32,
    ) -> Self {
        Self {
            reader_id,
            writer_id,
            reader_sn_state,
            count,
            final_flag: false,
        }
    }

    /// Requested sequence numbers, ascending.
    #[must_use]
    pub fn requested(&self) -> Vec<SequenceNumber> {
        self.reader_sn_state.iter().collect()
    }

    #[must_use]
    pub fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + 12 + self.reader_sn_state.word_count() * 4 + 4);
        buf.extend_from_slice(&self.reader_id);
        buf.extend_from_slice(&self.writer_id);
        write_sn_set(&mut buf, &self.reader_sn_state);
        buf.extend_from_slice(&self.count.to_le_bytes());
        buf
    }

    #[must_use]
    pub fn decode_body(body: &[u8], le: bool, final_flag: bool) -> Option<Self> {
        let reader_id = read_entity(body, 0)?;
        let writer_id = read_entity(body, 4)?;
        let (reader_sn_state, consumed) = read_sn_set(body, 8, le)?;
        let count = read_u32(body, 8 + consumed, le)?;
        Some(Self {
            reader_id,
            writer_id,
            reader_sn_state,
            count,
            final_flag,
        })
    }
}

// ============================================================================
// GAP
// ============================================================================

/// GAP message (writer -> reader, DDS-RTPS v2.5 Sec.8.3.7.4).
///
/// Irrelevant numbers are `[gap_start, gap_list.base())` plus every member
/// of `gap_list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapMsg {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub gap_start: SequenceNumber,
    pub gap_list: SequenceNumberSet,
}

impl GapMsg {
    #[must_use]
    pub fn new(
        reader_id: EntityId,
        writer_id: EntityId,
        gap_start: SequenceNumber,
        gap_list: SequenceNumberSet,
    ) -> Self {
        Self {
            reader_id,
            writer_id,
            gap_start,
            gap_list,
        }
    }

    /// GAP covering the contiguous range `[start, end)`.
    #[must_use]
    pub fn contiguous(
        reader_id: EntityId,
        writer_id: EntityId,
        range: Range<SequenceNumber>,
    ) -> Option<Self> {
        if range.start >= range.end {
            return None;
        }
        Some(Self::new(
            reader_id,
            writer_id,
            range.start,
            SequenceNumberSet::new(range.end),
        ))
    }

    /// Irrelevant numbers as coalesced half-open ranges, ascending.
    ///
    /// `[gap_start, gap_list.base)` stays a single range however wide it
    /// is; only the bitmap (at most 256 entries) is walked.
    #[must_use]
    pub fn lost_ranges(&self) -> Vec<Range<SequenceNumber>> {
        let mut ranges: Vec<Range<SequenceNumber>> = Vec::new();
        if self.gap_start < self.gap_list.base() {
            ranges.push(self.gap_start..self.gap_list.base());
        }
        for sn in self.gap_list.iter().filter(|s| *s >= self.gap_start) {
            match ranges.last_mut() {
                Some(last) if last.end == sn => last.end = sn + 1,
                _ => ranges.push(sn..sn + 1),
            }
        }
        ranges
    }

    #[must_use]
    pub fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + 8 + 12 + self.gap_list.word_count() * 4);
        buf.extend_from_slice(&self.reader_id);
        buf.extend_from_slice(&self.writer_id);
        self.gap_start.write_le(&mut buf);
        write_sn_set(&mut buf, &self.gap_list);
        buf
    }

    #[must_use]
    pub fn decode_body(body: &[u8], le: bool) -> Option<Self> {
        let reader_id = read_entity(body, 0)?;
        let writer_id = read_entity(body, 4)?;
        let gap_start = read_sn(body, 8, le)?;
        let (gap_list, _) = read_sn_set(body, 16, le)?;
        Some(Self::new(reader_id, writer_id, gap_start, gap_list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::{ENTITYID_UNKNOWN_READER, ENTITYID_UNKNOWN_WRITER};

    fn sn(v: u64) -> SequenceNumber {
        SequenceNumber::from_u64(v)
    }

    #[test]
    fn test_data_body_layout() {
        let msg = DataMsg::new(
            ENTITYID_UNKNOWN_READER,
            [0, 0, 1, 0x02],
            SequenceNumber::new(0, 7),
            b"abc".to_vec(),
        );
        let body = msg.encode_body();
        assert_eq!(body.len() % 4, 0);
        assert_eq!(&body[2..4], &16u16.to_le_bytes());
        assert_eq!(DataMsg::peek_writer_sn(&body, true), Some(sn(7)));

        let decoded = DataMsg::decode_body(&body, true).expect("decode");
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_heartbeat_big_endian_decode() {
        let mut body = Vec::new();
        body.extend_from_slice(&ENTITYID_UNKNOWN_READER);
        body.extend_from_slice(&ENTITYID_UNKNOWN_WRITER);
        body.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 1]);
        body.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 2]);
        body.extend_from_slice(&9u32.to_be_bytes());

        let hb = HeartbeatMsg::decode_body(&body, false, true, false).expect("decode");
        assert_eq!(hb.first_sn, sn(1));
        assert_eq!(hb.last_sn, SequenceNumber::new(1, 2));
        assert_eq!(hb.count, 9);
        assert!(hb.final_flag);
    }

    #[test]
    fn test_acknack_body_carries_bitmap() {
        let set = SequenceNumberSet::from_sequences(sn(3), &[sn(3), sn(5), sn(40)]).expect("fits");
        let ack = AckNackMsg::new(ENTITYID_UNKNOWN_READER, ENTITYID_UNKNOWN_WRITER, set, 4);
        let body = ack.encode_body();
        // ids(8) + base(8) + numBits(4) + 2 words + count(4)
        assert_eq!(body.len(), 8 + 8 + 4 + 8 + 4);

        let decoded = AckNackMsg::decode_body(&body, true, false).expect("decode");
        assert_eq!(decoded.requested(), vec![sn(3), sn(5), sn(40)]);
        assert_eq!(decoded.count, 4);
    }

    #[test]
    fn test_acknack_truncated_rejected() {
        let set = SequenceNumberSet::from_sequences(sn(1), &[sn(100)]).expect("fits");
        let body = AckNackMsg::new([0; 4], [0; 4], set, 1).encode_body();
        assert!(AckNackMsg::decode_body(&body[..body.len() - 5], true, false).is_none());
    }

    #[test]
    fn test_out_of_range_sequence_numbers_rejected() {
        let set = SequenceNumberSet::new(sn(1));
        let mut body = AckNackMsg::new([0; 4], [0; 4], set, 1).encode_body();
        body[8..12].copy_from_slice(&i32::MIN.to_le_bytes());
        assert!(AckNackMsg::decode_body(&body, true, false).is_none());

        let gap = GapMsg::contiguous([0; 4], [0; 4], sn(1)..sn(3)).expect("non-empty");
        let mut body = gap.encode_body();
        body[8..12].copy_from_slice(&i32::MAX.to_le_bytes());
        assert!(GapMsg::decode_body(&body, true).is_none());

        let mut body = gap.encode_body();
        body[16..20].copy_from_slice(&(-5i32).to_le_bytes());
        assert!(GapMsg::decode_body(&body, true).is_none());

        let data = DataMsg::new([0; 4], [0; 4], SequenceNumber::new(i32::MAX, 1), vec![1]);
        let body = data.encode_body();
        assert_eq!(DataMsg::peek_writer_sn(&body, true), None);
        assert!(DataMsg::decode_body(&body, true).is_none());
    }

    #[test]
    fn test_gap_lost_ranges() {
        let gap = GapMsg::contiguous([0; 4], [0; 4], sn(4)..sn(7)).expect("non-empty");
        assert_eq!(gap.lost_ranges(), vec![sn(4)..sn(7)]);
        assert!(GapMsg::contiguous([0; 4], [0; 4], sn(7)..sn(7)).is_none());

        let list = SequenceNumberSet::from_sequences(sn(10), &[sn(12)]).expect("fits");
        let gap = GapMsg::new([0; 4], [0; 4], sn(9), list);
        let decoded = GapMsg::decode_body(&gap.encode_body(), true).expect("decode");
        assert_eq!(decoded.lost_ranges(), vec![sn(9)..sn(10), sn(12)..sn(13)]);

        let list = SequenceNumberSet::from_sequences(sn(10), &[sn(10), sn(11), sn(13)]).expect("fits");
        let gap = GapMsg::new([0; 4], [0; 4], sn(8), list);
        assert_eq!(gap.lost_ranges(), vec![sn(8)..sn(12), sn(13)..sn(14)]);
    }

    #[test]
    fn test_gap_wide_range_not_expanded() {
        let start = SequenceNumber::new(0, 1);
        let end = SequenceNumber::new(0x4000_0000, 0);
        let list = SequenceNumberSet::from_sequences(end, &[end + 1]).expect("fits");
        let gap = GapMsg::new([0; 4], [0; 4], start, list);
        let decoded = GapMsg::decode_body(&gap.encode_body(), true).expect("decode");
        assert_eq!(decoded.lost_ranges(), vec![start..end, end + 1..end + 2]);
    }
}
