// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fault-injecting transport decorator.
//!
//! Wraps a best-effort transport and silently discards selected outgoing
//! packets so that reliability repair can be exercised deterministically.
//! A drop is not an error: `send` returns `Ok(())` and the drop is recorded
//! in the shared [`DropLog`].

mod config;
mod drop_log;

pub use config::FaultConfig;
pub use drop_log::{DropLog, DropReason, DropRecord};

use std::time::Instant;

use parking_lot::Mutex;

use super::{Locator, Transport};
use crate::config::MAX_DROP_PERCENTAGE;
use crate::protocol::{parse_packet, Submessage, SubmessageKind};
use crate::{Error, Result, SequenceNumber};

/// Transport that drops packets according to a [`FaultConfig`].
///
/// # Example
///
/// ```rust
/// use hdds_reliability::transport::{
///     FaultConfig, FaultInjectingTransport, IntraProcessTransport, Locator, Transport,
/// };
///
/// let config = FaultConfig::new().drop_heartbeat(true);
/// let transport = FaultInjectingTransport::new(IntraProcessTransport::new(), config);
/// let local = Locator::shm(1);
/// transport.open_output_channel(&local).unwrap();
/// assert!(transport.drop_log().is_empty());
/// ```
pub struct FaultInjectingTransport<T> {
    inner: T,
    config: FaultConfig,
    log: DropLog,
    rng: Mutex<fastrand::Rng>,
}

impl<T: Transport> FaultInjectingTransport<T> {
    #[must_use]
    pub fn new(inner: T, config: FaultConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        log::debug!(
            "[fault] transport created data={} acknack={} heartbeat={} percent={} seqs={} log_len={}",
            config.drop_data_messages,
            config.drop_acknack_messages,
            config.drop_heartbeat_messages,
            config.drop_percentage,
            config.sequence_numbers_to_drop.len(),
            config.drop_log_length
        );
        Self {
            inner,
            log: DropLog::new(config.drop_log_length),
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Wrap `inner` with rules from `HDDS_FAULT_*` environment variables.
    #[must_use]
    pub fn from_env(inner: T) -> Self {
        Self::new(inner, FaultConfig::from_env())
    }

    #[must_use]
    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    /// Shared handle onto the drop log.
    #[must_use]
    pub fn drop_log(&self) -> DropLog {
        self.log.clone()
    }

    #[must_use]
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// First matching rule for `buf`, with the submessage that triggered it.
    fn should_drop(
        &self,
        buf: &[u8],
    ) -> Option<(DropReason, Option<SubmessageKind>, Option<SequenceNumber>)> {
        let first_kind = match parse_packet(buf) {
            Ok(packet) => {
                if let Some(why) = packet.malformed {
                    log::trace!("[fault] matching rules on the valid prefix only ({})", why);
                }
                for sub in &packet.submessages {
                    if let Some(hit) = self.match_rule(sub) {
                        return Some(hit);
                    }
                }
                packet.submessages.first().map(Submessage::kind)
            }
            Err(e) => {
                log::trace!("[fault] unparsable packet ({}), no rule applies", e);
                None
            }
        };

        if self.roll_random() {
            return Some((DropReason::Random, first_kind, None));
        }
        None
    }

    fn match_rule(
        &self,
        sub: &Submessage,
    ) -> Option<(DropReason, Option<SubmessageKind>, Option<SequenceNumber>)> {
        match sub {
            Submessage::Data(data) => {
                let sn = Some(data.writer_sn);
                if self.config.drop_data_messages {
                    Some((DropReason::DataFilter, Some(SubmessageKind::Data), sn))
                } else if self
                    .config
                    .sequence_numbers_to_drop
                    .contains(&data.writer_sn)
                {
                    Some((DropReason::SequenceNumber, Some(SubmessageKind::Data), sn))
                } else {
                    None
                }
            }
            Submessage::AckNack(_) if self.config.drop_acknack_messages => Some((
                DropReason::AckNackFilter,
                Some(SubmessageKind::AckNack),
                None,
            )),
            Submessage::Heartbeat(_) if self.config.drop_heartbeat_messages => Some((
                DropReason::HeartbeatFilter,
                Some(SubmessageKind::Heartbeat),
                None,
            )),
            _ => None,
        }
    }

    fn roll_random(&self) -> bool {
        match self.config.drop_percentage {
            0 => false,
            p if p >= MAX_DROP_PERCENTAGE => true,
            p => self.rng.lock().u8(0..MAX_DROP_PERCENTAGE) < p,
        }
    }
}

impl<T: Transport> Transport for FaultInjectingTransport<T> {
    fn is_locator_supported(&self, locator: &Locator) -> bool {
        self.inner.is_locator_supported(locator)
    }

    fn open_output_channel(&self, local: &Locator) -> Result<()> {
        self.inner.open_output_channel(local)
    }

    fn close_output_channel(&self, local: &Locator) -> bool {
        self.inner.close_output_channel(local)
    }

    fn is_output_channel_open(&self, local: &Locator) -> bool {
        self.inner.is_output_channel_open(local)
    }

    fn send(&self, buf: &[u8], local: &Locator, remote: &Locator) -> Result<()> {
        if !self.inner.is_locator_supported(local) || !self.inner.is_locator_supported(remote) {
            // Same failure the inner transport reports; not a drop.
            return self.inner.send(buf, local, remote);
        }
        if !self.inner.is_output_channel_open(local) {
            return Err(Error::ChannelNotOpen);
        }

        if let Some((reason, kind, writer_sn)) = self.should_drop(buf) {
            match writer_sn {
                Some(sn) => log::debug!("[fault] dropped {:?} sn={} ({})", kind, sn, reason),
                None => log::debug!("[fault] dropped {:?} ({})", kind, reason),
            }
            self.log.push(DropRecord {
                reason,
                kind,
                writer_sn,
                remote: *remote,
                len: buf.len(),
                at: Instant::now(),
            });
            return Ok(());
        }

        self.inner.send(buf, local, remote)
    }
}
