// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS locators.
//!
//! ```text
//! struct Locator_t {
//!     long kind;           // 4 bytes: LOCATOR_KIND_*
//!     unsigned long port;  // 4 bytes
//!     octet address[16];   // 16 bytes: IPv4 (last 4) or IPv6 address
//! };
//! ```

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

// ============================================================================
// Constants
// ============================================================================

/// Locator kind: Invalid locator.
pub const LOCATOR_KIND_INVALID: i32 = -1;

/// Locator kind: Reserved.
pub const LOCATOR_KIND_RESERVED: i32 = 0;

/// Locator kind: UDP over IPv4 (standard RTPS).
pub const LOCATOR_KIND_UDPV4: i32 = 1;

/// Locator kind: UDP over IPv6 (standard RTPS).
pub const LOCATOR_KIND_UDPV6: i32 = 2;

/// Locator kind: Shared Memory (vendor extension).
pub const LOCATOR_KIND_SHM: i32 = 16;

/// Invalid port value.
pub const LOCATOR_PORT_INVALID: u32 = 0;

/// Locator address length (16 bytes).
pub const LOCATOR_ADDRESS_LEN: usize = 16;

/// Transport endpoint address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator {
    pub kind: i32,
    pub port: u32,
    pub address: [u8; LOCATOR_ADDRESS_LEN],
}

impl Locator {
    #[must_use]
    pub const fn new(kind: i32, port: u32, address: [u8; LOCATOR_ADDRESS_LEN]) -> Self {
        Self {
            kind,
            port,
            address,
        }
    }

    #[must_use]
    pub const fn invalid() -> Self {
        Self::new(
            LOCATOR_KIND_INVALID,
            LOCATOR_PORT_INVALID,
            [0; LOCATOR_ADDRESS_LEN],
        )
    }

    /// UDPv4 locator; the IPv4 address occupies the last 4 bytes.
    #[must_use]
    pub fn udpv4(ip: Ipv4Addr, port: u16) -> Self {
        let mut address = [0u8; LOCATOR_ADDRESS_LEN];
        address[12..16].copy_from_slice(&ip.octets());
        Self::new(LOCATOR_KIND_UDPV4, u32::from(port), address)
    }

    #[must_use]
    pub fn udpv6(ip: Ipv6Addr, port: u16) -> Self {
        Self::new(LOCATOR_KIND_UDPV6, u32::from(port), ip.octets())
    }

    /// Shared-memory / intra-process locator, identified by port only.
    #[must_use]
    pub fn shm(port: u32) -> Self {
        Self::new(LOCATOR_KIND_SHM, port, [0; LOCATOR_ADDRESS_LEN])
    }

    #[must_use]
    pub fn from_socket_addr(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => Self::udpv4(*v4.ip(), v4.port()),
            SocketAddr::V6(v6) => Self::udpv6(*v6.ip(), v6.port()),
        }
    }

    /// Socket address for UDP kinds; `None` for other kinds or ports that
    /// do not fit in 16 bits.
    #[must_use]
    pub fn to_socket_addr(&self) -> Option<SocketAddr> {
        let port = u16::try_from(self.port).ok()?;
        let ip = match self.kind {
            LOCATOR_KIND_UDPV4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(&self.address[12..16]);
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            LOCATOR_KIND_UDPV6 => IpAddr::V6(Ipv6Addr::from(self.address)),
            _ => return None,
        };
        Some(SocketAddr::new(ip, port))
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.kind != LOCATOR_KIND_INVALID && self.kind != LOCATOR_KIND_RESERVED
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LOCATOR_KIND_UDPV4 | LOCATOR_KIND_UDPV6 => match self.to_socket_addr() {
                Some(addr) => write!(f, "UDP:{}", addr),
                None => write!(f, "UDP:<port {}>", self.port),
            },
            LOCATOR_KIND_SHM => write!(f, "SHM:{}", self.port),
            LOCATOR_KIND_INVALID => write!(f, "INVALID"),
            other => write!(f, "KIND({}):{}", other, self.port),
        }
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Locator({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udpv4_layout() {
        let loc = Locator::udpv4(Ipv4Addr::new(192, 168, 1, 100), 7410);
        assert_eq!(loc.kind, LOCATOR_KIND_UDPV4);
        assert_eq!(loc.port, 7410);
        assert_eq!(&loc.address[..12], &[0; 12]);
        assert_eq!(&loc.address[12..], &[192, 168, 1, 100]);
        assert_eq!(
            loc.to_socket_addr(),
            Some("192.168.1.100:7410".parse().expect("addr"))
        );
    }

    #[test]
    fn test_socket_addr_roundtrip_v6() {
        let addr: SocketAddr = "[::1]:7400".parse().expect("addr");
        let loc = Locator::from_socket_addr(&addr);
        assert_eq!(loc.kind, LOCATOR_KIND_UDPV6);
        assert_eq!(loc.to_socket_addr(), Some(addr));
    }

    #[test]
    fn test_non_udp_has_no_socket_addr() {
        assert_eq!(Locator::shm(3).to_socket_addr(), None);
        assert!(!Locator::invalid().is_valid());
        assert_eq!(Locator::shm(3).to_string(), "SHM:3");
    }
}
