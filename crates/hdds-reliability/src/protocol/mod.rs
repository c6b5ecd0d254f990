// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS wire framing for the submessages the reliability core exchanges.
//!
//! Only DATA, HEARTBEAT, ACKNACK, GAP and INFO_DST are built or decoded;
//! other submessages are skipped over and reported as `Submessage::Other`.

mod builder;
mod classifier;
pub mod constants;

pub use builder::PacketBuilder;
pub use classifier::{parse_packet, ParsedPacket, Submessage, SubmessageKind};
