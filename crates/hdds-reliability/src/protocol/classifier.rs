// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS packet classification.
//!
//! Walks the submessage chain of a received (or about-to-be-sent) packet
//! and decodes the submessages the reliability core cares about. Anything
//! else is reported as `Submessage::Other` so callers can still count it.

use super::constants::{
    FLAG_ENDIANNESS, FLAG_FINAL, FLAG_LIVELINESS, RTPS_HEADER_LEN, RTPS_MAGIC, SUBMSG_ACKNACK,
    SUBMSG_DATA, SUBMSG_GAP, SUBMSG_HEADER_LEN, SUBMSG_HEARTBEAT, SUBMSG_INFO_DST,
};
use crate::guid::{GuidPrefix, GUID_PREFIX_LEN};
use crate::reliability::{AckNackMsg, DataMsg, GapMsg, HeartbeatMsg};
use crate::{Error, Result};

/// Coarse submessage kind, enough for fault rules and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmessageKind {
    Data,
    Heartbeat,
    AckNack,
    Gap,
    InfoDst,
    Other(u8),
}

impl SubmessageKind {
    #[must_use]
    pub fn from_id(id: u8) -> Self {
        match id {
            SUBMSG_DATA => Self::Data,
            SUBMSG_HEARTBEAT => Self::Heartbeat,
            SUBMSG_ACKNACK => Self::AckNack,
            SUBMSG_GAP => Self::Gap,
            SUBMSG_INFO_DST => Self::InfoDst,
            other => Self::Other(other),
        }
    }
}

/// A decoded submessage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submessage {
    Data(DataMsg),
    Heartbeat(HeartbeatMsg),
    AckNack(AckNackMsg),
    Gap(GapMsg),
    InfoDst(GuidPrefix),
    Other(u8),
}

impl Submessage {
    #[must_use]
    pub fn kind(&self) -> SubmessageKind {
        match self {
            Submessage::Data(_) => SubmessageKind::Data,
            Submessage::Heartbeat(_) => SubmessageKind::Heartbeat,
            Submessage::AckNack(_) => SubmessageKind::AckNack,
            Submessage::Gap(_) => SubmessageKind::Gap,
            Submessage::InfoDst(_) => SubmessageKind::InfoDst,
            Submessage::Other(id) => SubmessageKind::Other(*id),
        }
    }
}

/// A parsed RTPS message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPacket {
    /// Source participant (from the RTPS header).
    pub guid_prefix: GuidPrefix,
    /// Submessages decoded before the first malformed one, if any.
    pub submessages: Vec<Submessage>,
    /// Why decoding stopped early; the rest of the packet was ignored.
    pub malformed: Option<&'static str>,
}

impl ParsedPacket {
    /// True if any submessage is of `kind`.
    #[must_use]
    pub fn contains(&self, kind: SubmessageKind) -> bool {
        self.submessages.iter().any(|s| s.kind() == kind)
    }
}

/// Parse an RTPS message.
///
/// A submessage whose `octetsToNextHeader` is 0 extends to the end of the
/// packet (DDS-RTPS v2.5 Sec.9.4.5.1.3). Only a bad RTPS header is an
/// error: an invalid submessage ends the walk, keeping what precedes it
/// (DDS-RTPS v2.5 Sec.8.3.4.1).
pub fn parse_packet(packet: &[u8]) -> Result<ParsedPacket> {
    if packet.len() < RTPS_HEADER_LEN {
        return Err(Error::Malformed("shorter than RTPS header"));
    }
    if &packet[0..4] != RTPS_MAGIC {
        return Err(Error::Malformed("bad RTPS magic"));
    }

    let mut guid_prefix = [0u8; GUID_PREFIX_LEN];
    guid_prefix.copy_from_slice(&packet[8..RTPS_HEADER_LEN]);

    let mut submessages = Vec::new();
    let mut malformed = None;
    let mut offset = RTPS_HEADER_LEN;
    while offset + SUBMSG_HEADER_LEN <= packet.len() {
        let id = packet[offset];
        let flags = packet[offset + 1];
        let le = flags & FLAG_ENDIANNESS != 0;
        let raw_len = [packet[offset + 2], packet[offset + 3]];
        let declared = usize::from(if le {
            u16::from_le_bytes(raw_len)
        } else {
            u16::from_be_bytes(raw_len)
        });

        let body_start = offset + SUBMSG_HEADER_LEN;
        let body_end = if declared == 0 {
            packet.len()
        } else {
            body_start + declared
        };
        let Some(body) = packet.get(body_start..body_end) else {
            malformed = Some("submessage overruns packet");
            break;
        };

        let decoded = match id {
            SUBMSG_DATA => DataMsg::decode_body(body, le).map(Submessage::Data),
            SUBMSG_HEARTBEAT => HeartbeatMsg::decode_body(
                body,
                le,
                flags & FLAG_FINAL != 0,
                flags & FLAG_LIVELINESS != 0,
            )
            .map(Submessage::Heartbeat),
            SUBMSG_ACKNACK => {
                AckNackMsg::decode_body(body, le, flags & FLAG_FINAL != 0).map(Submessage::AckNack)
            }
            SUBMSG_GAP => GapMsg::decode_body(body, le).map(Submessage::Gap),
            SUBMSG_INFO_DST => body
                .get(..GUID_PREFIX_LEN)
                .and_then(|b| b.try_into().ok())
                .map(Submessage::InfoDst),
            other => Some(Submessage::Other(other)),
        };
        match decoded {
            Some(sub) => submessages.push(sub),
            None => {
                malformed = Some("invalid submessage body");
                break;
            }
        }

        if declared == 0 {
            break;
        }
        offset = body_end;
    }

    Ok(ParsedPacket {
        guid_prefix,
        submessages,
        malformed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PacketBuilder;
    use crate::reliability::{SequenceNumber, SequenceNumberSet};

    #[test]
    fn test_parse_mixed_packet() {
        let data = DataMsg::new([0; 4], [0, 0, 1, 2], SequenceNumber::from(5), b"xyz".to_vec());
        let hb = HeartbeatMsg::new(
            [0; 4],
            [0, 0, 1, 2],
            SequenceNumber::from(1),
            SequenceNumber::from(5),
            3,
        );
        let packet = PacketBuilder::new([9; 12])
            .info_dst([4; 12])
            .data(&data)
            .heartbeat(&hb)
            .build();

        let parsed = parse_packet(&packet).expect("valid packet");
        assert_eq!(parsed.guid_prefix, [9; 12]);
        assert_eq!(
            parsed.submessages,
            vec![
                Submessage::InfoDst([4; 12]),
                Submessage::Data(data),
                Submessage::Heartbeat(hb),
            ]
        );
        assert!(parsed.contains(SubmessageKind::Heartbeat));
        assert!(!parsed.contains(SubmessageKind::AckNack));
    }

    #[test]
    fn test_parse_acknack_flags() {
        let mut ack = AckNackMsg::new(
            [0; 4],
            [0; 4],
            SequenceNumberSet::new(SequenceNumber::from(4)),
            7,
        );
        ack.final_flag = true;
        let packet = PacketBuilder::new([1; 12]).acknack(&ack).build();
        let parsed = parse_packet(&packet).expect("valid packet");
        assert_eq!(parsed.submessages, vec![Submessage::AckNack(ack)]);
    }

    #[test]
    fn test_zero_length_extends_to_end() {
        let mut packet = PacketBuilder::new([1; 12]).build();
        packet.extend_from_slice(&[0x80, 0x01, 0x00, 0x00, 1, 2, 3, 4]);
        let parsed = parse_packet(&packet).expect("valid packet");
        assert_eq!(parsed.submessages, vec![Submessage::Other(0x80)]);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_packet(b"RTP").is_err());
        assert!(parse_packet(&[0u8; 24]).is_err());

        let mut packet = PacketBuilder::new([1; 12]).build();
        packet.extend_from_slice(&[SUBMSG_DATA, 0x01, 0x40, 0x00, 0, 0]);
        let parsed = parse_packet(&packet).expect("header is valid");
        assert!(parsed.submessages.is_empty());
        assert_eq!(parsed.malformed, Some("submessage overruns packet"));
    }

    #[test]
    fn test_bad_trailing_submessage_keeps_prefix() {
        let data = DataMsg::new([0; 4], [0, 0, 1, 2], SequenceNumber::from(5), b"xyz".to_vec());
        let mut packet = PacketBuilder::new([1; 12]).data(&data).build();
        // HEARTBEAT with a 4-byte body: too short for its fields.
        packet.extend_from_slice(&[SUBMSG_HEARTBEAT, 0x01, 0x04, 0x00, 0, 0, 0, 0]);

        let parsed = parse_packet(&packet).expect("header is valid");
        assert_eq!(parsed.submessages, vec![Submessage::Data(data)]);
        assert_eq!(parsed.malformed, Some("invalid submessage body"));
        assert!(parsed.contains(SubmessageKind::Data));
    }

    #[test]
    fn test_negative_sequence_number_rejected() {
        let ack = AckNackMsg::new([0; 4], [0; 4], SequenceNumberSet::new(SequenceNumber::from(1)), 1);
        let mut packet = PacketBuilder::new([1; 12]).acknack(&ack).build();
        // base.high sits after the RTPS header, submessage header and two entity ids.
        let high = RTPS_HEADER_LEN + SUBMSG_HEADER_LEN + 8;
        packet[high..high + 4].copy_from_slice(&i32::MIN.to_le_bytes());

        let parsed = parse_packet(&packet).expect("header is valid");
        assert!(parsed.submessages.is_empty());
        assert!(parsed.malformed.is_some());
    }
}
