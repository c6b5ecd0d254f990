// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDPv4 best-effort transport.
//!
//! One socket per opened output channel, bound to the local locator's
//! address and port with `SO_REUSEADDR`. Sends use `send_to` so a single
//! socket can reach any remote.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::Arc;

use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};

use super::{Locator, Transport, LOCATOR_KIND_UDPV4};
use crate::config::MAX_PACKET_SIZE;
use crate::{Error, Result};

/// UDPv4 transport.
#[allow(clippy::module_name_repetitions)]
#[derive(Default)]
pub struct UdpTransport {
    channels: Mutex<HashMap<Locator, Arc<UdpSocket>>>,
}

impl UdpTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Address the channel for `local` is actually bound to (resolves port 0).
    #[must_use]
    pub fn bound_addr(&self, local: &Locator) -> Option<SocketAddr> {
        self.channels
            .lock()
            .get(local)
            .and_then(|socket| socket.local_addr().ok())
    }

    #[must_use]
    pub fn open_channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    fn bind(local: &Locator) -> Result<UdpSocket> {
        let bind_addr = match local.to_socket_addr() {
            Some(SocketAddr::V4(v4)) => v4,
            _ => SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0),
        };

        let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket2.set_reuse_address(true)?;
        socket2.bind(&SocketAddr::V4(bind_addr).into())?;
        let socket: UdpSocket = socket2.into();
        log::debug!(
            "[UDP] output channel bound addr={:?}",
            socket.local_addr().ok()
        );
        Ok(socket)
    }
}

impl Transport for UdpTransport {
    fn is_locator_supported(&self, locator: &Locator) -> bool {
        locator.kind == LOCATOR_KIND_UDPV4
    }

    fn open_output_channel(&self, local: &Locator) -> Result<()> {
        if !self.is_locator_supported(local) {
            return Err(Error::UnsupportedLocator(local.kind));
        }
        let mut channels = self.channels.lock();
        if channels.contains_key(local) {
            return Ok(());
        }
        let socket = Self::bind(local)?;
        channels.insert(*local, Arc::new(socket));
        Ok(())
    }

    fn close_output_channel(&self, local: &Locator) -> bool {
        let closed = self.channels.lock().remove(local).is_some();
        if closed {
            log::debug!("[UDP] output channel closed {}", local);
        }
        closed
    }

    fn is_output_channel_open(&self, local: &Locator) -> bool {
        self.channels.lock().contains_key(local)
    }

    fn send(&self, buf: &[u8], local: &Locator, remote: &Locator) -> Result<()> {
        if !self.is_locator_supported(local) {
            return Err(Error::UnsupportedLocator(local.kind));
        }
        if !self.is_locator_supported(remote) {
            return Err(Error::UnsupportedLocator(remote.kind));
        }
        if buf.len() > MAX_PACKET_SIZE {
            return Err(Error::SendFailed(format!(
                "datagram of {} bytes exceeds {}",
                buf.len(),
                MAX_PACKET_SIZE
            )));
        }

        let socket = self
            .channels
            .lock()
            .get(local)
            .cloned()
            .ok_or(Error::ChannelNotOpen)?;
        let dest = remote
            .to_socket_addr()
            .ok_or(Error::UnsupportedLocator(remote.kind))?;

        let sent = socket.send_to(buf, dest)?;
        if sent != buf.len() {
            return Err(Error::SendFailed(format!(
                "short send {} of {} bytes to {}",
                sent,
                buf.len(),
                dest
            )));
        }
        log::trace!("[UDP] sent {} bytes {} -> {}", sent, local, remote);
        Ok(())
    }
}
