// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Best-effort transports and the fault-injecting decorator.
//!
//! | Transport | Locator kind | Use |
//! |-----------|--------------|-----|
//! | `UdpTransport` | UDPv4 | real sockets via `socket2` |
//! | `IntraProcessTransport` | SHM | in-process queues, deterministic tests |
//! | `FaultInjectingTransport<T>` | same as `T` | controlled loss in front of `T` |

mod fault;
mod intraprocess;
mod locator;
mod udp;

pub use fault::{DropLog, DropReason, DropRecord, FaultConfig, FaultInjectingTransport};
pub use intraprocess::IntraProcessTransport;
pub use locator::{
    Locator, LOCATOR_ADDRESS_LEN, LOCATOR_KIND_INVALID, LOCATOR_KIND_RESERVED, LOCATOR_KIND_SHM,
    LOCATOR_KIND_UDPV4, LOCATOR_KIND_UDPV6, LOCATOR_PORT_INVALID,
};
pub use udp::UdpTransport;

use crate::Result;

/// Datagram transport boundary.
///
/// Output channels are keyed by the *local* locator: a send must name a
/// local locator whose channel was opened beforehand.
pub trait Transport: Send + Sync {
    /// Whether this transport can handle `locator`'s kind.
    fn is_locator_supported(&self, locator: &Locator) -> bool;

    /// Open (idempotently) the output channel for `local`.
    fn open_output_channel(&self, local: &Locator) -> Result<()>;

    /// Close the output channel; returns whether it was open.
    fn close_output_channel(&self, local: &Locator) -> bool;

    fn is_output_channel_open(&self, local: &Locator) -> bool;

    /// Send one datagram from `local` to `remote`.
    fn send(&self, buf: &[u8], local: &Locator, remote: &Locator) -> Result<()>;
}
