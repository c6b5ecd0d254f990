// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS wire constants (DDS-RTPS v2.5 Sec.9.4).

/// RTPS magic bytes at the start of every message.
pub const RTPS_MAGIC: &[u8; 4] = b"RTPS";
/// Protocol version advertised in the header (2.4).
pub const RTPS_VERSION: [u8; 2] = [2, 4];
/// HDDS vendor id.
pub const HDDS_VENDOR_ID: [u8; 2] = [0x01, 0xAA];

/// RTPS header: magic(4) + version(2) + vendor(2) + guidPrefix(12).
pub const RTPS_HEADER_LEN: usize = 20;
/// Submessage header: id(1) + flags(1) + octetsToNextHeader(2).
pub const SUBMSG_HEADER_LEN: usize = 4;

// ============================================================================
// Submessage IDs
// ============================================================================

pub const SUBMSG_ACKNACK: u8 = 0x06;
pub const SUBMSG_HEARTBEAT: u8 = 0x07;
pub const SUBMSG_GAP: u8 = 0x08;
pub const SUBMSG_INFO_TS: u8 = 0x09;
pub const SUBMSG_INFO_DST: u8 = 0x0e;
pub const SUBMSG_DATA: u8 = 0x15;

// ============================================================================
// Flags
// ============================================================================

/// E flag: submessage body is little-endian.
pub const FLAG_ENDIANNESS: u8 = 0x01;
/// F flag (HEARTBEAT/ACKNACK): no response required.
pub const FLAG_FINAL: u8 = 0x02;
/// L flag (HEARTBEAT): liveliness assertion.
pub const FLAG_LIVELINESS: u8 = 0x04;
/// Q flag (DATA): inline QoS present.
pub const FLAG_INLINE_QOS: u8 = 0x02;
/// D flag (DATA): serialized payload present.
pub const FLAG_DATA_PRESENT: u8 = 0x04;

/// Encapsulation header for CDR little-endian payloads.
pub const CDR_LE_ENCAPSULATION: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

/// DATA octetsToInlineQos when no inline QoS follows (readerId..writerSN).
pub const DATA_OCTETS_TO_INLINE_QOS: u16 = 16;
