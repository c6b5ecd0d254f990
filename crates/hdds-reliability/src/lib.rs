// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hdds-reliability
//!
//! Reliability and liveliness core for RTPS publish/subscribe over
//! unreliable transports.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                      Reliability driver                             |
//! |   ReliableWriter (DATA, HEARTBEAT, retransmit/GAP)                  |
//! |   ReliableReader (GapTracker -> ACKNACK, in-order delivery)         |
//! +---------------------------------------------------------------------+
//! |   SequenceNumber | SequenceNumberSet (256-bit) | HistoryCache       |
//! +---------------------------------------------------------------------+
//! |   LivelinessManager (one shared timer, lost/recovered listener)     |
//! +---------------------------------------------------------------------+
//! |                        Transport Layer                              |
//! |   UdpTransport | IntraProcessTransport | FaultInjectingTransport<T> |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SequenceNumber`] | 64-bit sample counter split as `(high: i32, low: u32)` |
//! | [`SequenceNumberSet`] | Base plus 256-bit bitmap, carried in ACKNACK and GAP |
//! | [`LivelinessManager`] | Per-writer leases with a single expiry timer |
//! | [`FaultInjectingTransport`] | Transport decorator dropping packets by rule |
//! | [`ReliableWriter`] / [`ReliableReader`] | Reliable protocol endpoints |
//!
//! ## Quick Start
//!
//! ```rust
//! use hdds_reliability::{
//!     FaultConfig, FaultInjectingTransport, Guid, IntraProcessTransport, Locator,
//!     ReliableReader, ReliableWriter, ReliableWriterConfig, Result,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let transport = Arc::new(FaultInjectingTransport::new(
//!         IntraProcessTransport::new(),
//!         FaultConfig::default(),
//!     ));
//!     let (w_loc, r_loc) = (Locator::shm(1), Locator::shm(2));
//!     let to_reader = transport.inner().open_input_channel(&r_loc)?;
//!
//!     let w_guid = Guid::new([1; 12], [0, 0, 1, 0x02]);
//!     let writer = ReliableWriter::new(
//!         w_guid,
//!         Arc::clone(&transport),
//!         w_loc,
//!         r_loc,
//!         ReliableWriterConfig::default(),
//!     )?;
//!     let reader = ReliableReader::new(
//!         Guid::new([2; 12], [0, 0, 1, 0x07]),
//!         w_guid,
//!         transport,
//!         r_loc,
//!         w_loc,
//!     )?;
//!
//!     writer.write(b"hello")?;
//!     let packet = to_reader.recv().expect("DATA");
//!     let samples = reader.on_packet(&packet)?;
//!     assert_eq!(samples[0].payload, b"hello");
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`] facade with `[component]` tags
//! (`[reliable]`, `[fault]`, `[liveliness]`, ...). No logger is installed
//! by this crate.

/// Compile-time defaults and RTPS port mapping.
pub mod config;
mod error;
mod guid;
/// Writer liveliness leases.
pub mod liveliness;
/// RTPS packet framing and classification.
pub mod protocol;
/// Sequence numbers, gap tracking and the reliable endpoints.
pub mod reliability;
/// Transports and fault injection.
pub mod transport;

pub use error::{Error, Result};
pub use guid::{
    EntityId, Guid, GuidPrefix, ENTITYID_UNKNOWN_READER, ENTITYID_UNKNOWN_WRITER, ENTITY_ID_LEN,
    GUID_PREFIX_LEN,
};
pub use liveliness::{
    ClosureLivelinessListener, Liveliness, LivelinessData, LivelinessKind, LivelinessListener,
    LivelinessManager, LivelinessManagerBuilder, LivelinessManagerConfig, WriterStatus,
    INFINITE_LEASE,
};
pub use reliability::{
    AckNackMsg, DataMsg, GapMsg, GapTracker, HeartbeatMsg, HeartbeatScheduler, MetricsSnapshot,
    ReceiveOutcome, ReliableMetrics, ReliableReader, ReliableWriter, ReliableWriterConfig, Sample,
    SeqNumGenerator, SequenceNumber, SequenceNumberSet,
};
pub use transport::{
    DropLog, DropReason, DropRecord, FaultConfig, FaultInjectingTransport, IntraProcessTransport,
    Locator, Transport, UdpTransport,
};
