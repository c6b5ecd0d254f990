// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Liveliness manager with a single shared expiry timer.
//!
//! # State machine (per writer)
//!
//! ```text
//!            add_writer
//!                |
//!                v
//!   +------> ALIVE ----lease elapsed----> NOT_ALIVE
//!   |            ^                            |
//!   |            +--------- asserted ---------+  (on_liveliness_recovered)
//!   |                                            (on_liveliness_lost on the way down)
//!   +-- asserted (expiration = now + lease)
//! ```
//!
//! Exactly one timer exists per manager. It is armed for the soonest
//! expiration among alive, timed writers and re-armed whenever a mutation
//! changes that minimum.
//!
//! Lost/recovered events are queued under the state lock in the order the
//! transitions happen. Whichever thread holds the dispatch gate delivers
//! them one at a time from the front of that queue, so a listener sees
//! each writer's transitions in order whether they came from the timer or
//! from an assertion.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::ReentrantMutex;

use super::data::{LivelinessData, WriterStatus};
use super::timer::{Armed, SharedTimer, TimerCore};
use super::{is_infinite_lease, Liveliness, LivelinessKind, LivelinessListener};
use crate::config::DEFAULT_MAX_WRITERS;
use crate::guid::{Guid, GuidPrefix};
use crate::{Error, Result};

/// Name of the timer thread.
const TIMER_THREAD_NAME: &str = "hdds-liveliness";

// ============================================================================
// Configuration
// ============================================================================

/// Manager settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivelinessManagerConfig {
    /// When false, automatic writers are tracked but never timed.
    pub manage_automatic: bool,
    /// Maximum number of tracked writers.
    pub max_writers: usize,
}

impl Default for LivelinessManagerConfig {
    fn default() -> Self {
        Self {
            manage_automatic: true,
            max_writers: DEFAULT_MAX_WRITERS,
        }
    }
}

/// Builder for [`LivelinessManager`].
#[derive(Default)]
pub struct LivelinessManagerBuilder {
    config: LivelinessManagerConfig,
    listener: Option<Arc<dyn LivelinessListener>>,
}

impl LivelinessManagerBuilder {
    #[must_use]
    pub fn config(mut self, config: LivelinessManagerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn max_writers(mut self, max: usize) -> Self {
        self.config.max_writers = max;
        self
    }

    #[must_use]
    pub fn manage_automatic(mut self, manage: bool) -> Self {
        self.config.manage_automatic = manage;
        self
    }

    #[must_use]
    pub fn listener<L: LivelinessListener + 'static>(mut self, listener: L) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    #[must_use]
    pub fn shared_listener(mut self, listener: Arc<dyn LivelinessListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Create the manager and start its timer thread.
    pub fn build(self) -> Result<LivelinessManager> {
        LivelinessManager::with_listener(self.config, self.listener)
    }
}

// ============================================================================
// Manager
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum LivelinessEvent {
    Lost(Guid),
    Recovered(Guid),
}

struct Registry {
    records: Vec<LivelinessData>,
    manage_automatic: bool,
    /// Transitions not yet delivered, oldest first.
    pending: VecDeque<LivelinessEvent>,
}

impl Registry {
    fn is_timed(&self, kind: LivelinessKind) -> bool {
        kind != LivelinessKind::Automatic || self.manage_automatic
    }

    fn position(&self, guid: &Guid) -> Option<usize> {
        self.records.iter().position(|r| r.guid == *guid)
    }

    /// Soonest expiration among alive, timed records.
    fn next_expiration(&self) -> Option<Instant> {
        self.records
            .iter()
            .filter_map(LivelinessData::pending_expiration)
            .min()
    }

    /// Assert every record matching `pred` at the same instant.
    fn assert_where<F>(&mut self, now: Instant, pred: F) -> bool
    where
        F: Fn(&LivelinessData) -> bool,
    {
        let manage_automatic = self.manage_automatic;
        let mut any = false;
        for record in self.records.iter_mut().filter(|r| pred(r)) {
            let timed = record.kind != LivelinessKind::Automatic || manage_automatic;
            if record.refresh(now, timed) {
                self.pending.push_back(LivelinessEvent::Recovered(record.guid));
            }
            any = true;
        }
        any
    }

    /// Timer handler: mark every due record NotAlive.
    ///
    /// Returns the next deadline and whether any record went down.
    fn expire(&mut self, now: Instant) -> (Option<Instant>, bool) {
        let before = self.pending.len();
        for record in self.records.iter_mut().filter(|r| r.is_due(now)) {
            record.status = WriterStatus::NotAlive;
            self.pending.push_back(LivelinessEvent::Lost(record.guid));
        }
        (self.next_expiration(), self.pending.len() > before)
    }
}

/// Delivers queued events to the listener.
struct Dispatcher {
    listener: Option<Arc<dyn LivelinessListener>>,
    /// Held while delivering. Re-entrant: a callback may call back into
    /// the manager on the same thread.
    gate: ReentrantMutex<()>,
}

impl Dispatcher {
    fn new(listener: Option<Arc<dyn LivelinessListener>>) -> Self {
        Self {
            listener,
            gate: ReentrantMutex::new(()),
        }
    }

    /// Deliver every queued event, oldest first.
    ///
    /// Must be called without the state lock held.
    fn drain(&self, core: &TimerCore<Registry>) {
        let _gate = self.gate.lock();
        loop {
            let next = core.lock().inner.pending.pop_front();
            let Some(event) = next else {
                break;
            };
            self.deliver(event);
        }
    }

    fn deliver(&self, event: LivelinessEvent) {
        match event {
            LivelinessEvent::Lost(guid) => {
                log::debug!("[liveliness] writer {} lost", guid);
                if let Some(l) = &self.listener {
                    l.on_liveliness_lost(guid);
                }
            }
            LivelinessEvent::Recovered(guid) => {
                log::debug!("[liveliness] writer {} recovered", guid);
                if let Some(l) = &self.listener {
                    l.on_liveliness_recovered(guid);
                }
            }
        }
    }
}

/// Tracks writer leases with one shared timer.
///
/// All mutations and the expiry handler run under one lock covering the
/// records and the armed deadline. Listener callbacks run after that lock
/// is released, serialized and in transition order. Calls that cause a
/// transition return only after its callback was delivered.
///
/// # Example
///
/// ```rust
/// use hdds_reliability::{Guid, LivelinessKind, LivelinessManager};
/// use std::time::Duration;
///
/// let manager = LivelinessManager::builder().build().unwrap();
/// let w1 = Guid::new([1; 12], [0, 0, 1, 2]);
/// let w2 = Guid::new([1; 12], [0, 0, 2, 2]);
/// manager.add_writer(w1, LivelinessKind::Automatic, Duration::from_secs(1)).unwrap();
/// manager.add_writer(w2, LivelinessKind::Automatic, Duration::from_secs(5)).unwrap();
///
/// // Armed for W1, the soonest to expire.
/// let w1_exp = manager.writer_data(&w1).unwrap().expiration;
/// assert_eq!(manager.timer_deadline(), w1_exp);
///
/// // Asserting one automatic writer asserts the whole participant.
/// manager.assert_liveliness(&w2);
/// let data = manager.liveliness_data();
/// assert_eq!(data[0].expiration.map(|e| e + Duration::from_secs(4)), data[1].expiration);
/// ```
pub struct LivelinessManager {
    timer: SharedTimer<Registry>,
    dispatcher: Arc<Dispatcher>,
    config: LivelinessManagerConfig,
}

impl LivelinessManager {
    #[must_use]
    pub fn builder() -> LivelinessManagerBuilder {
        LivelinessManagerBuilder::default()
    }

    /// Manager without a listener.
    pub fn new(config: LivelinessManagerConfig) -> Result<Self> {
        Self::with_listener(config, None)
    }

    fn with_listener(
        config: LivelinessManagerConfig,
        listener: Option<Arc<dyn LivelinessListener>>,
    ) -> Result<Self> {
        let core = Arc::new(TimerCore::new(Registry {
            records: Vec::with_capacity(config.max_writers.min(64)),
            manage_automatic: config.manage_automatic,
            pending: VecDeque::new(),
        }));
        let dispatcher = Arc::new(Dispatcher::new(listener));
        let timer_dispatcher = Arc::clone(&dispatcher);
        let timer_core = Arc::clone(&core);
        let timer = SharedTimer::spawn(
            TIMER_THREAD_NAME,
            core,
            |registry: &mut Registry, now| registry.expire(now),
            move || timer_dispatcher.drain(&timer_core),
        )?;
        log::debug!(
            "[liveliness] manager started max_writers={} manage_automatic={}",
            config.max_writers,
            config.manage_automatic
        );
        Ok(Self {
            timer,
            dispatcher,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &LivelinessManagerConfig {
        &self.config
    }

    fn core(&self) -> &TimerCore<Registry> {
        self.timer.core()
    }

    /// Run `f` under the lock, re-arm the timer, then deliver queued
    /// events unlocked.
    fn mutate<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut Armed<Registry>) -> T,
    {
        let core = self.core();
        let (result, queued) = {
            let mut guard = core.lock();
            let result = f(&mut *guard);
            let next = guard.inner.next_expiration();
            core.rearm(&mut guard, next);
            (result, !guard.inner.pending.is_empty())
        };
        if queued {
            self.dispatcher.drain(core);
        }
        result
    }

    /// Start tracking `guid`.
    ///
    /// # Errors
    ///
    /// - `InvalidLease` for a zero lease
    /// - `DuplicateWriter` if `guid` is already tracked
    /// - `ResourceLimitExceeded` when `max_writers` records exist
    pub fn add_writer(&self, guid: Guid, kind: LivelinessKind, lease: Duration) -> Result<()> {
        if lease.is_zero() {
            return Err(Error::InvalidLease);
        }
        let max_writers = self.config.max_writers;
        self.mutate(|armed| {
            let registry = &mut armed.inner;
            if registry.position(&guid).is_some() {
                return Err(Error::DuplicateWriter);
            }
            if registry.records.len() >= max_writers {
                return Err(Error::ResourceLimitExceeded(format!(
                    "liveliness manager full (max_writers={})",
                    max_writers
                )));
            }
            let timed = registry.is_timed(kind) && !is_infinite_lease(lease);
            registry
                .records
                .push(LivelinessData::new(guid, kind, lease, Instant::now(), timed));
            log::debug!(
                "[liveliness] add writer {} kind={} lease={:?}",
                guid,
                kind,
                lease
            );
            Ok(())
        })
    }

    /// Start tracking `guid` with a QoS policy.
    pub fn add_writer_with_policy(&self, guid: Guid, policy: &Liveliness) -> Result<()> {
        self.add_writer(guid, policy.kind, policy.lease_duration)
    }

    /// Stop tracking `guid`; returns `false` if it was unknown.
    ///
    /// The timer is re-armed (or disarmed) before this returns.
    pub fn remove_writer(&self, guid: &Guid) -> bool {
        self.mutate(|armed| match armed.inner.position(guid) {
            Some(idx) => {
                armed.inner.records.remove(idx);
                log::debug!("[liveliness] remove writer {}", guid);
                true
            }
            None => false,
        })
    }

    /// Assert `guid` at `now`.
    ///
    /// Automatic and manual-by-participant writers assert every writer of
    /// the same kind in the same participant. Manual-by-topic asserts only
    /// `guid`. Returns `false` if `guid` is unknown.
    pub fn assert_liveliness(&self, guid: &Guid) -> bool {
        self.mutate(|armed| {
            let registry = &mut armed.inner;
            let Some(idx) = registry.position(guid) else {
                return false;
            };
            let kind = registry.records[idx].kind;
            let now = Instant::now();
            if kind.is_participant_wide() {
                let prefix = guid.prefix;
                registry.assert_where(now, |r| r.kind == kind && r.guid.prefix == prefix)
            } else {
                let target = *guid;
                registry.assert_where(now, |r| r.guid == target)
            }
        })
    }

    /// Assert every writer of `kind`; returns whether any matched.
    pub fn assert_liveliness_kind(&self, kind: LivelinessKind) -> bool {
        self.mutate(|armed| armed.inner.assert_where(Instant::now(), |r| r.kind == kind))
    }

    /// Assert every writer of the participant; returns whether any matched.
    pub fn assert_liveliness_participant(&self, prefix: &GuidPrefix) -> bool {
        let prefix = *prefix;
        self.mutate(|armed| {
            armed
                .inner
                .assert_where(Instant::now(), |r| r.guid.prefix == prefix)
        })
    }

    /// True if at least one writer of `kind` is alive.
    #[must_use]
    pub fn is_any_alive(&self, kind: LivelinessKind) -> bool {
        self.core()
            .lock()
            .inner
            .records
            .iter()
            .any(|r| r.kind == kind && r.is_alive())
    }

    #[must_use]
    pub fn writer_status(&self, guid: &Guid) -> Option<WriterStatus> {
        self.writer_data(guid).map(|d| d.status)
    }

    /// Copy of one writer's record.
    #[must_use]
    pub fn writer_data(&self, guid: &Guid) -> Option<LivelinessData> {
        let guard = self.core().lock();
        guard.inner.position(guid).map(|idx| guard.inner.records[idx])
    }

    /// Copies of every record, in insertion order.
    #[must_use]
    pub fn liveliness_data(&self) -> Vec<LivelinessData> {
        self.core().lock().inner.records.clone()
    }

    /// Instant the shared timer is armed for; `None` when disarmed.
    #[must_use]
    pub fn timer_deadline(&self) -> Option<Instant> {
        self.core().lock().deadline()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.core().lock().inner.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core().lock().inner.records.is_empty()
    }
}

impl Drop for LivelinessManager {
    fn drop(&mut self) {
        log::debug!("[liveliness] manager stopping");
    }
}
