// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single shared timer thread.
//!
//! The armed deadline lives under the same mutex as the state it guards,
//! so re-arming is atomic with the mutation that caused it. The thread
//! sleeps on a condvar until the deadline and wakes early on re-arm.
//!
//! ```text
//! mutation (under lock) --rearm(Some(t))--> notify
//!                                            |
//! timer thread: wait_until(t) --due--> expire(state, now) -> (next, fired)
//!               unlock --> notify() --> relock
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::Result;

/// State guarded together with the armed deadline.
pub(crate) struct Armed<S> {
    pub(crate) inner: S,
    deadline: Option<Instant>,
    stopped: bool,
}

impl<S> Armed<S> {
    #[must_use]
    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Mutex + condvar shared between mutating threads and the timer thread.
pub(crate) struct TimerCore<S> {
    state: Mutex<Armed<S>>,
    cv: Condvar,
}

impl<S> TimerCore<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            state: Mutex::new(Armed {
                inner,
                deadline: None,
                stopped: false,
            }),
            cv: Condvar::new(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Armed<S>> {
        self.state.lock()
    }

    /// Arm for `deadline` (`None` disarms). Only wakes the thread when the
    /// armed deadline actually changes.
    pub(crate) fn rearm(&self, guard: &mut MutexGuard<'_, Armed<S>>, deadline: Option<Instant>) {
        if guard.deadline != deadline {
            guard.deadline = deadline;
            self.cv.notify_one();
        }
    }
}

/// Owner of the timer thread; joins it on drop.
pub(crate) struct SharedTimer<S> {
    core: Arc<TimerCore<S>>,
    thread: Option<JoinHandle<()>>,
}

impl<S: Send + 'static> SharedTimer<S> {
    /// Spawn the timer thread.
    ///
    /// `expire` runs under the lock when the deadline is reached and returns
    /// the next deadline plus whether anything fired; `notify` then runs
    /// with the lock released.
    pub(crate) fn spawn<X, N>(
        name: &str,
        core: Arc<TimerCore<S>>,
        mut expire: X,
        mut notify: N,
    ) -> Result<Self>
    where
        X: FnMut(&mut S, Instant) -> (Option<Instant>, bool) + Send + 'static,
        N: FnMut() + Send + 'static,
    {
        let thread_core = Arc::clone(&core);
        let thread = thread::Builder::new().name(name.into()).spawn(move || {
            let core = thread_core;
            let mut guard = core.state.lock();
            loop {
                if guard.stopped {
                    break;
                }
                let Some(deadline) = guard.deadline else {
                    core.cv.wait(&mut guard);
                    continue;
                };
                let now = Instant::now();
                if now < deadline {
                    core.cv.wait_until(&mut guard, deadline);
                    continue;
                }

                let (next, fired) = expire(&mut guard.inner, now);
                guard.deadline = next;
                if fired {
                    MutexGuard::unlocked(&mut guard, || notify());
                }
            }
        })?;

        Ok(Self {
            core,
            thread: Some(thread),
        })
    }
}

impl<S> SharedTimer<S> {
    pub(crate) fn core(&self) -> &Arc<TimerCore<S>> {
        &self.core
    }
}

impl<S> Drop for SharedTimer<S> {
    fn drop(&mut self) {
        {
            let mut guard = self.core.state.lock();
            guard.stopped = true;
            self.core.cv.notify_all();
        }
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::warn!("[liveliness] timer thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_fires_once_per_deadline() {
        let core = Arc::new(TimerCore::new(0u32));
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_thread = Arc::clone(&fired);
        let timer = SharedTimer::spawn(
            "test-timer",
            Arc::clone(&core),
            |count: &mut u32, _now| {
                *count += 1;
                (None, true)
            },
            move || {
                fired_in_thread.fetch_add(1, Ordering::SeqCst);
            },
        )
        .expect("spawn");

        {
            let mut guard = core.lock();
            core.rearm(&mut guard, Some(Instant::now() + Duration::from_millis(10)));
        }
        thread::sleep(Duration::from_millis(100));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(timer.core().lock().inner, 1);
        assert_eq!(timer.core().lock().deadline(), None);
    }

    #[test]
    fn test_disarm_before_deadline() {
        let core = Arc::new(TimerCore::new(()));
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_thread = Arc::clone(&fired);
        let _timer = SharedTimer::spawn(
            "test-timer",
            Arc::clone(&core),
            |_: &mut (), _now| (None, true),
            move || {
                fired_in_thread.fetch_add(1, Ordering::SeqCst);
            },
        )
        .expect("spawn");

        {
            let mut guard = core.lock();
            core.rearm(&mut guard, Some(Instant::now() + Duration::from_millis(30)));
            core.rearm(&mut guard, None);
        }
        thread::sleep(Duration::from_millis(80));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
