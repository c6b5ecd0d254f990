// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded record of intentionally dropped datagrams.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::protocol::SubmessageKind;
use crate::transport::Locator;
use crate::SequenceNumber;

/// Upper bound on entries allocated up front; larger logs grow on demand.
const PREALLOCATED_ENTRIES: usize = 1024;

/// Which rule caused a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    DataFilter,
    AckNackFilter,
    HeartbeatFilter,
    SequenceNumber,
    Random,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DataFilter => "data-filter",
            Self::AckNackFilter => "acknack-filter",
            Self::HeartbeatFilter => "heartbeat-filter",
            Self::SequenceNumber => "sequence-number",
            Self::Random => "random",
        };
        f.write_str(s)
    }
}

/// One dropped datagram.
#[derive(Debug, Clone)]
pub struct DropRecord {
    pub reason: DropReason,
    /// Submessage that triggered the rule (first submessage for random drops).
    pub kind: Option<SubmessageKind>,
    /// DATA writerSN when the trigger was a DATA submessage.
    pub writer_sn: Option<SequenceNumber>,
    pub remote: Locator,
    pub len: usize,
    pub at: Instant,
}

struct Inner {
    entries: Mutex<VecDeque<DropRecord>>,
    capacity: usize,
    total: AtomicU64,
}

/// Shared, bounded drop log.
///
/// Cloning yields another handle onto the same log. Once `capacity`
/// entries are held, each new entry evicts the oldest one.
#[derive(Clone)]
pub struct DropLog {
    inner: Arc<Inner>,
}

impl DropLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(VecDeque::with_capacity(capacity.min(PREALLOCATED_ENTRIES))),
                capacity,
                total: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn push(&self, record: DropRecord) {
        self.inner.total.fetch_add(1, Ordering::Relaxed);
        if self.inner.capacity == 0 {
            return;
        }
        let mut entries = self.inner.entries.lock();
        while entries.len() >= self.inner.capacity {
            entries.pop_front();
        }
        entries.push_back(record);
    }

    /// Copies of the retained entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<DropRecord> {
        self.inner.entries.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Drops since creation, including evicted entries.
    #[must_use]
    pub fn total_dropped(&self) -> u64 {
        self.inner.total.load(Ordering::Relaxed)
    }

    /// Forget retained entries; `total_dropped` is kept.
    pub fn clear(&self) {
        self.inner.entries.lock().clear();
    }
}

impl fmt::Debug for DropLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropLog")
            .field("len", &self.len())
            .field("capacity", &self.inner.capacity)
            .field("total_dropped", &self.total_dropped())
            .finish()
    }
}
