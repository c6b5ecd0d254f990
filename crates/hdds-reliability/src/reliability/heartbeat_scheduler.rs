// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic heartbeat thread for a [`ReliableWriter`].
//!
//! Without periodic heartbeats, a writer that bursts data and then goes idle
//! never triggers ACKNACKs, and losses at the tail of the burst are never
//! repaired.
//!
//! ```text
//! Writer                              Reader
//!   |--DATA(1-100) burst------------->  (some lost)
//!   |  (writer idle, thread continues)
//!   |--HEARTBEAT(first=1,last=100)--->  (every period)
//!   |<--------ACKNACK(missing=[...])--|
//!   |--DATA retransmit--------------->
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use super::ReliableWriter;
use crate::transport::Transport;
use crate::Result;

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cv: Condvar,
}

/// Handle to the heartbeat thread.
///
/// When dropped, signals the thread to stop and waits for it to join.
pub struct HeartbeatScheduler {
    signal: Arc<StopSignal>,
    thread: Option<JoinHandle<()>>,
}

impl HeartbeatScheduler {
    /// Spawn `hdds-heartbeat`, sending whenever the writer's heartbeat is due.
    pub fn spawn<T>(writer: Arc<ReliableWriter<T>>) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let signal = Arc::new(StopSignal::default());
        let thread_signal = Arc::clone(&signal);
        let thread = thread::Builder::new()
            .name("hdds-heartbeat".into())
            .spawn(move || heartbeat_loop(&writer, &thread_signal))?;

        Ok(Self {
            signal,
            thread: Some(thread),
        })
    }

    /// Stop and join the thread (also done on drop).
    pub fn stop(&mut self) {
        *self.signal.stopped.lock() = true;
        self.signal.cv.notify_all();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::warn!("[heartbeat] thread panicked");
            }
        }
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn heartbeat_loop<T: Transport>(writer: &ReliableWriter<T>, signal: &StopSignal) {
    log::debug!("[heartbeat] thread started for writer {}", writer.guid());

    loop {
        let deadline = writer.next_heartbeat_deadline();
        {
            let mut stopped = signal.stopped.lock();
            while !*stopped && Instant::now() < deadline {
                if signal.cv.wait_until(&mut stopped, deadline).timed_out() {
                    break;
                }
            }
            if *stopped {
                break;
            }
        }

        if writer.last_sequence().is_none() {
            // Nothing written yet: push the deadline forward without sending.
            writer.skip_heartbeat();
            continue;
        }
        if let Err(e) = writer.poll_heartbeat(Instant::now()) {
            log::debug!("[heartbeat] failed to send HEARTBEAT: {}", e);
        }
    }

    log::debug!("[heartbeat] thread stopped for writer {}", writer.guid());
}
