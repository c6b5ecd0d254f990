// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS packet framing.
//!
//! ```text
//! +---------------------------+
//! | RTPS header (20 bytes)    |  "RTPS" | version | vendor | guidPrefix
//! +---------------------------+
//! | [INFO_DST] (4 + 12)       |  optional destination participant
//! +---------------------------+
//! | submessage header (4)     |  id | flags(E=1) | octetsToNextHeader
//! | submessage body           |
//! +---------------------------+
//! | ...                       |
//! ```

use super::constants::{
    FLAG_DATA_PRESENT, FLAG_ENDIANNESS, FLAG_FINAL, FLAG_LIVELINESS, HDDS_VENDOR_ID, RTPS_MAGIC,
    RTPS_VERSION, SUBMSG_ACKNACK, SUBMSG_DATA, SUBMSG_GAP, SUBMSG_HEARTBEAT, SUBMSG_INFO_DST,
};
use crate::config::RTPS_PACKET_INITIAL_CAPACITY;
use crate::guid::GuidPrefix;
use crate::reliability::{AckNackMsg, DataMsg, GapMsg, HeartbeatMsg};

/// Incremental RTPS message builder.
///
/// # Example
///
/// ```rust
/// use hdds_reliability::protocol::PacketBuilder;
/// use hdds_reliability::{DataMsg, SequenceNumber};
///
/// let data = DataMsg::new([0; 4], [0, 0, 1, 2], SequenceNumber::from(1), b"hi".to_vec());
/// let packet = PacketBuilder::new([7; 12]).data(&data).build();
/// assert_eq!(&packet[0..4], b"RTPS");
/// ```
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    buf: Vec<u8>,
}

impl PacketBuilder {
    /// Start a message from participant `guid_prefix`.
    #[must_use]
    pub fn new(guid_prefix: GuidPrefix) -> Self {
        let mut buf = Vec::with_capacity(RTPS_PACKET_INITIAL_CAPACITY);
        buf.extend_from_slice(RTPS_MAGIC);
        buf.extend_from_slice(&RTPS_VERSION);
        buf.extend_from_slice(&HDDS_VENDOR_ID);
        buf.extend_from_slice(&guid_prefix);
        Self { buf }
    }

    fn submessage(mut self, id: u8, flags: u8, body: &[u8]) -> Self {
        let len = u16::try_from(body.len()).unwrap_or_else(|_| {
            log::warn!(
                "[builder] submessage 0x{:02x} body {} bytes exceeds u16; using 0 (extends to end)",
                id,
                body.len()
            );
            0
        });
        self.buf.push(id);
        self.buf.push(flags | FLAG_ENDIANNESS);
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(body);
        self
    }

    /// Address following submessages to one participant.
    #[must_use]
    pub fn info_dst(self, guid_prefix: GuidPrefix) -> Self {
        self.submessage(SUBMSG_INFO_DST, 0, &guid_prefix)
    }

    #[must_use]
    pub fn data(self, msg: &DataMsg) -> Self {
        self.submessage(SUBMSG_DATA, FLAG_DATA_PRESENT, &msg.encode_body())
    }

    #[must_use]
    pub fn heartbeat(self, msg: &HeartbeatMsg) -> Self {
        let mut flags = 0;
        if msg.final_flag {
            flags |= FLAG_FINAL;
        }
        if msg.liveliness_flag {
            flags |= FLAG_LIVELINESS;
        }
        self.submessage(SUBMSG_HEARTBEAT, flags, &msg.encode_body())
    }

    #[must_use]
    pub fn acknack(self, msg: &AckNackMsg) -> Self {
        let flags = if msg.final_flag { FLAG_FINAL } else { 0 };
        self.submessage(SUBMSG_ACKNACK, flags, &msg.encode_body())
    }

    #[must_use]
    pub fn gap(self, msg: &GapMsg) -> Self {
        self.submessage(SUBMSG_GAP, 0, &msg.encode_body())
    }

    /// Finish and return the encoded message.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}
