// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-writer liveliness record.

use std::time::{Duration, Instant};

use super::LivelinessKind;
use crate::Guid;

/// Liveliness state of a tracked writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriterStatus {
    Alive,
    /// Lease elapsed without assertion; back to `Alive` on next assertion.
    NotAlive,
}

/// Snapshot of one writer's liveliness bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivelinessData {
    pub guid: Guid,
    pub kind: LivelinessKind,
    pub lease_duration: Duration,
    pub last_assertion: Instant,
    /// `last_assertion + lease_duration`; `None` when the writer can never
    /// expire (infinite lease, or an automatic writer the manager does not time).
    pub expiration: Option<Instant>,
    pub status: WriterStatus,
}

impl LivelinessData {
    pub(crate) fn new(
        guid: Guid,
        kind: LivelinessKind,
        lease_duration: Duration,
        now: Instant,
        timed: bool,
    ) -> Self {
        let mut data = Self {
            guid,
            kind,
            lease_duration,
            last_assertion: now,
            expiration: None,
            status: WriterStatus::Alive,
        };
        data.refresh(now, timed);
        data
    }

    /// Record an assertion at `now`; returns `true` if the writer recovered.
    pub(crate) fn refresh(&mut self, now: Instant, timed: bool) -> bool {
        self.last_assertion = now;
        self.expiration = if timed {
            now.checked_add(self.lease_duration)
        } else {
            None
        };
        let recovered = self.status == WriterStatus::NotAlive;
        self.status = WriterStatus::Alive;
        recovered
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.status == WriterStatus::Alive
    }

    /// Alive and due to expire at or before `now`.
    #[must_use]
    pub(crate) fn is_due(&self, now: Instant) -> bool {
        self.is_alive() && self.expiration.is_some_and(|exp| exp <= now)
    }

    /// Expiration that participates in the shared timer.
    #[must_use]
    pub(crate) fn pending_expiration(&self) -> Option<Instant> {
        if self.is_alive() {
            self.expiration
        } else {
            None
        }
    }
}
