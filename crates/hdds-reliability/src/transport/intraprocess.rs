// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport over crossbeam channels.
//!
//! Locators are `LOCATOR_KIND_SHM` and are identified by port. Readers
//! register an input channel for a port and drain datagrams from the
//! returned receiver. A send to a port nobody listens on is dropped
//! silently, like UDP.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use super::{Locator, Transport, LOCATOR_KIND_SHM};
use crate::{Error, Result};

#[derive(Default)]
pub struct IntraProcessTransport {
    outputs: Mutex<HashSet<u32>>,
    inputs: Mutex<HashMap<u32, Sender<Vec<u8>>>>,
    delivered: AtomicU64,
}

impl IntraProcessTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener on `local`; replaces any previous listener.
    pub fn open_input_channel(&self, local: &Locator) -> Result<Receiver<Vec<u8>>> {
        if !self.is_locator_supported(local) {
            return Err(Error::UnsupportedLocator(local.kind));
        }
        let (tx, rx) = channel::unbounded();
        if self.inputs.lock().insert(local.port, tx).is_some() {
            log::debug!("[INTRA] input channel on port {} replaced", local.port);
        }
        Ok(rx)
    }

    pub fn close_input_channel(&self, local: &Locator) -> bool {
        self.inputs.lock().remove(&local.port).is_some()
    }

    /// Datagrams handed to a listener so far.
    #[must_use]
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

impl Transport for IntraProcessTransport {
    fn is_locator_supported(&self, locator: &Locator) -> bool {
        locator.kind == LOCATOR_KIND_SHM
    }

    fn open_output_channel(&self, local: &Locator) -> Result<()> {
        if !self.is_locator_supported(local) {
            return Err(Error::UnsupportedLocator(local.kind));
        }
        self.outputs.lock().insert(local.port);
        Ok(())
    }

    fn close_output_channel(&self, local: &Locator) -> bool {
        self.outputs.lock().remove(&local.port)
    }

    fn is_output_channel_open(&self, local: &Locator) -> bool {
        self.is_locator_supported(local) && self.outputs.lock().contains(&local.port)
    }

    fn send(&self, buf: &[u8], local: &Locator, remote: &Locator) -> Result<()> {
        if !self.is_locator_supported(local) {
            return Err(Error::UnsupportedLocator(local.kind));
        }
        if !self.is_locator_supported(remote) {
            return Err(Error::UnsupportedLocator(remote.kind));
        }
        if !self.outputs.lock().contains(&local.port) {
            return Err(Error::ChannelNotOpen);
        }

        let target = self.inputs.lock().get(&remote.port).cloned();
        match target {
            Some(tx) => {
                if tx.send(buf.to_vec()).is_err() {
                    // Receiver dropped: unregister and behave like a lost datagram.
                    self.inputs.lock().remove(&remote.port);
                    log::trace!("[INTRA] listener on port {} gone", remote.port);
                } else {
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                }
            }
            None => log::trace!("[INTRA] no listener on port {}", remote.port),
        }
        Ok(())
    }
}
