// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::LivelinessKind;
use std::time::Duration;

/// Lease used for "never expires".
pub const INFINITE_LEASE: Duration = Duration::MAX;

/// True for leases that can never elapse.
#[must_use]
pub fn is_infinite_lease(lease: Duration) -> bool {
    lease == INFINITE_LEASE || lease == Duration::from_secs(u64::MAX)
}

/// LIVELINESS QoS policy: kind plus lease duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveliness {
    pub kind: LivelinessKind,
    pub lease_duration: Duration,
}

impl Default for Liveliness {
    fn default() -> Self {
        Self {
            kind: LivelinessKind::Automatic,
            lease_duration: INFINITE_LEASE,
        }
    }
}

impl Liveliness {
    #[must_use]
    pub fn new(kind: LivelinessKind, lease_duration: Duration) -> Self {
        Self {
            kind,
            lease_duration,
        }
    }

    #[must_use]
    pub fn automatic(lease_duration: Duration) -> Self {
        Self::new(LivelinessKind::Automatic, lease_duration)
    }

    #[must_use]
    pub fn manual_by_participant(lease_duration: Duration) -> Self {
        Self::new(LivelinessKind::ManualByParticipant, lease_duration)
    }

    #[must_use]
    pub fn manual_by_topic(lease_duration: Duration) -> Self {
        Self::new(LivelinessKind::ManualByTopic, lease_duration)
    }

    /// Automatic liveliness that never expires.
    #[must_use]
    pub fn infinite() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_infinite(&self) -> bool {
        is_infinite_lease(self.lease_duration)
    }

    /// Create automatic liveliness from milliseconds.
    #[must_use]
    pub fn automatic_millis(ms: u64) -> Self {
        Self::automatic(Duration::from_millis(ms))
    }

    /// Create manual-by-participant liveliness from milliseconds.
    #[must_use]
    pub fn manual_participant_millis(ms: u64) -> Self {
        Self::manual_by_participant(Duration::from_millis(ms))
    }

    /// Create manual-by-topic liveliness from milliseconds.
    #[must_use]
    pub fn manual_topic_millis(ms: u64) -> Self {
        Self::manual_by_topic(Duration::from_millis(ms))
    }
}
