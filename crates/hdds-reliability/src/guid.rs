// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS GUID (Globally Unique Identifier) for writers and participants.

use std::fmt;

/// Participant GUID prefix length (12 bytes).
pub const GUID_PREFIX_LEN: usize = 12;

/// Entity ID length (4 bytes).
pub const ENTITY_ID_LEN: usize = 4;

/// Participant GUID prefix.
pub type GuidPrefix = [u8; GUID_PREFIX_LEN];

/// RTPS Entity ID (4 bytes).
pub type EntityId = [u8; ENTITY_ID_LEN];

/// RTPS constant: ENTITYID_UNKNOWN (reader side).
pub const ENTITYID_UNKNOWN_READER: EntityId = [0x00, 0x00, 0x00, 0xC7];

/// RTPS constant: generic USER_DATA writer entity.
pub const ENTITYID_UNKNOWN_WRITER: EntityId = [0x00, 0x00, 0x00, 0xC2];

/// RTPS GUID
///
/// 16-byte identifier: a 12-byte participant prefix followed by a 4-byte
/// entity id. Two writers belong to the same participant iff their prefixes
/// are equal; the liveliness engine relies on that for participant-wide
/// assertion.
///
/// # Display Format
/// Hex with dots: "01.0f.ac.10.00.00.00.00.00.00.00.01.00.00.01.c2"
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Guid {
    pub prefix: GuidPrefix,
    pub entity_id: EntityId,
}

impl Guid {
    /// Create GUID from separate prefix and entity ID
    #[must_use]
    pub const fn new(prefix: GuidPrefix, entity_id: EntityId) -> Self {
        Self { prefix, entity_id }
    }

    /// Create GUID from raw bytes (16 bytes total)
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut prefix = [0u8; GUID_PREFIX_LEN];
        let mut entity_id = [0u8; ENTITY_ID_LEN];
        prefix.copy_from_slice(&bytes[0..12]);
        entity_id.copy_from_slice(&bytes[12..16]);
        Self { prefix, entity_id }
    }

    /// Convert GUID to 16-byte array
    #[must_use]
    pub fn as_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..12].copy_from_slice(&self.prefix);
        bytes[12..16].copy_from_slice(&self.entity_id);
        bytes
    }

    /// GUID with all zeros (invalid/placeholder)
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            prefix: [0; GUID_PREFIX_LEN],
            entity_id: [0; ENTITY_ID_LEN],
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.prefix.iter().all(|&b| b == 0) && self.entity_id.iter().all(|&b| b == 0)
    }

    /// True when both GUIDs share a participant prefix.
    #[must_use]
    pub fn same_participant(&self, other: &Guid) -> bool {
        self.prefix == other.prefix
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.prefix.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        for byte in &self.entity_id {
            write!(f, ".{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}
