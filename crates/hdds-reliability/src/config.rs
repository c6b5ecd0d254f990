// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Static configuration constants.
//!
//! Runtime knobs live next to the component they configure
//! (`FaultConfig`, `LivelinessManagerConfig`, `ReliableWriterConfig`);
//! this module only holds the compile-time defaults they start from.

// =======================================================================
// RTPS port mapping
// =======================================================================

/// RTPS base port (IANA registered, DDS-RTPS v2.5 Sec.9.6.1.1)
pub const PORT_BASE: u16 = 7400;

/// Gain applied per domain when computing well-known ports.
pub const DOMAIN_ID_GAIN: u16 = 250;

/// Offset of the user unicast port for participant 0.
pub const USER_UNICAST_OFFSET: u16 = 11;

/// Maximum UDP datagram size we ever build or receive.
pub const MAX_PACKET_SIZE: usize = 65536;

/// Initial capacity for packet builders (header + one small submessage).
pub const RTPS_PACKET_INITIAL_CAPACITY: usize = 128;

// =======================================================================
// Reliability
// =======================================================================

/// First sequence number assigned by a writer.
pub const INITIAL_SEQUENCE_NUMBER: u64 = 1;

/// Default heartbeat period in milliseconds (RTPS recommendation: 100ms)
pub const DEFAULT_HEARTBEAT_PERIOD_MS: u64 = 100;

/// Default KEEP_LAST depth for the writer history cache.
pub const DEFAULT_HISTORY_DEPTH: usize = 256;

// =======================================================================
// Liveliness
// =======================================================================

/// Default bound on writers tracked by one `LivelinessManager`.
pub const DEFAULT_MAX_WRITERS: usize = 4096;

// =======================================================================
// Fault injection
// =======================================================================

/// Default number of entries kept in a fault transport's drop log.
pub const DEFAULT_DROP_LOG_LENGTH: usize = 10;

/// Upper bound for `drop_percentage`.
pub const MAX_DROP_PERCENTAGE: u8 = 100;

/// Computes the user unicast port for a domain/participant pair.
#[must_use]
pub fn user_unicast_port(domain_id: u16, participant_id: u16) -> u16 {
    PORT_BASE + DOMAIN_ID_GAIN * domain_id + USER_UNICAST_OFFSET + 2 * participant_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_unicast_port_domain0() {
        assert_eq!(user_unicast_port(0, 0), 7411);
        assert_eq!(user_unicast_port(0, 1), 7413);
        assert_eq!(user_unicast_port(1, 0), 7661);
    }
}
