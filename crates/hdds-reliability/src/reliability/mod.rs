// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # RTPS Reliability Core
//!
//! Sequence numbers, the ACKNACK bitmap set, and the writer/reader
//! state machines that repair packet loss.
//!
//! ## Protocol Flow
//!
//! ```text
//! Writer                                    Reader
//!   |                                          |
//!   |--- DATA (seq=1) ------------------------>|
//!   |--- DATA (seq=2) ----------X (lost)       |
//!   |--- DATA (seq=3) ------------------------>|
//!   |                                          |
//!   |--- HEARTBEAT (first=1, last=3) --------->|
//!   |                                          | (detects gap: seq=2 missing)
//!   |<-- ACKNACK (base=2, set={2}) ------------|
//!   |                                          |
//!   |--- DATA (seq=2) [retransmit] ----------->|
//!   |                                          | (gap filled)
//! ```
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | `SequenceNumber` | 64-bit counter split as `(high: i32, low: u32)` |
//! | `SequenceNumberSet` | base + 256-bit bitmap carried in ACKNACK and GAP |
//! | `HeartbeatTx` / `HeartbeatRx` | Heartbeat counts and freshness filtering |
//! | `AckNackTx` | Reader builds ACKNACK from its `GapTracker` |
//! | `WriterRetransmitHandler` | Writer answers ACKNACK from `HistoryCache` or with GAP |
//! | `ReliableWriter` / `ReliableReader` | Endpoints driving the above over a `Transport` |
//! | `ReliableMetrics` | Observability counters |

// Core types
mod gap_tracker;
mod metrics;
mod seq;
mod sequence_set;

// Protocol messages
mod messages;

// Protocol handlers
mod reader;
mod writer;

// History cache
mod history_cache;

// Endpoints
mod driver;
mod heartbeat_scheduler;

// ============================================================================
// Public re-exports: Core types
// ============================================================================
pub use gap_tracker::{GapTracker, ReceiveOutcome};
pub use metrics::{MetricsSnapshot, ReliableMetrics};
pub use seq::{SeqNumGenerator, SequenceNumber, SEQUENCE_NUMBER_LEN};
pub use sequence_set::{SequenceNumberIter, SequenceNumberSet, MAX_BITMAP_BITS};

// ============================================================================
// Public re-exports: Messages
// ============================================================================
pub use messages::{AckNackMsg, DataMsg, GapMsg, HeartbeatMsg};

// ============================================================================
// Public re-exports: Protocol handlers
// ============================================================================
pub use history_cache::{CacheEntry, HistoryCache};
pub use reader::{AckNackTx, GapRx, HeartbeatRx};
pub use writer::{GapTx, HeartbeatTx, RetransmitPlan, WriterRetransmitHandler, DEFAULT_JITTER_PCT};

// ============================================================================
// Public re-exports: Endpoints
// ============================================================================
pub use driver::{ReliableReader, ReliableWriter, ReliableWriterConfig, Sample};
pub use heartbeat_scheduler::HeartbeatScheduler;
