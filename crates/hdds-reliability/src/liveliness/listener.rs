// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::Guid;

/// Receives liveliness transitions from a `LivelinessManager`.
///
/// Callbacks run on whichever thread caused the transition (the timer
/// thread for losses, the asserting thread for recoveries) and never while
/// the manager's lock is held, so they may call back into the manager.
pub trait LivelinessListener: Send + Sync {
    /// Writer's lease elapsed without assertion.
    fn on_liveliness_lost(&self, writer: Guid);

    /// Previously lost writer asserted liveliness again.
    fn on_liveliness_recovered(&self, writer: Guid) {
        let _ = writer;
    }
}

/// Listener built from two closures.
pub struct ClosureLivelinessListener<L, R> {
    lost: L,
    recovered: R,
}

impl<L, R> ClosureLivelinessListener<L, R>
where
    L: Fn(Guid) + Send + Sync,
    R: Fn(Guid) + Send + Sync,
{
    pub fn new(lost: L, recovered: R) -> Self {
        Self { lost, recovered }
    }
}

impl<L, R> LivelinessListener for ClosureLivelinessListener<L, R>
where
    L: Fn(Guid) + Send + Sync,
    R: Fn(Guid) + Send + Sync,
{
    fn on_liveliness_lost(&self, writer: Guid) {
        (self.lost)(writer);
    }

    fn on_liveliness_recovered(&self, writer: Guid) {
        (self.recovered)(writer);
    }
}
