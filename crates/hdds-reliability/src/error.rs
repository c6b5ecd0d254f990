// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by the liveliness engine and the transports.

/// Errors returned by reliability, liveliness and transport operations.
///
/// Simulated packet loss is *not* an error: a dropped send returns `Ok(())`
/// and is recorded in the fault transport's drop log instead.
///
/// # Example
///
/// ```rust
/// use hdds_reliability::{Error, Guid, LivelinessKind, LivelinessManager};
/// use std::time::Duration;
///
/// let manager = LivelinessManager::builder().max_writers(1).build().unwrap();
/// let w1 = Guid::new([1; 12], [0, 0, 1, 2]);
/// let w2 = Guid::new([1; 12], [0, 0, 2, 2]);
/// manager.add_writer(w1, LivelinessKind::Automatic, Duration::from_secs(1)).unwrap();
///
/// match manager.add_writer(w2, LivelinessKind::Automatic, Duration::from_secs(1)) {
///     Err(Error::ResourceLimitExceeded(msg)) => println!("full: {}", msg),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Generic configuration error (prefer specific variants below).
    Config,
    /// Configuration value out of range or unparsable.
    InvalidConfig(String),
    /// Lease duration of zero (a writer could never be alive).
    InvalidLease,

    // ========================================================================
    // Liveliness Errors
    // ========================================================================
    /// Bounded collection is full (max writers reached).
    ResourceLimitExceeded(String),
    /// Writer GUID already registered with the manager.
    DuplicateWriter,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Locator kind not handled by this transport.
    UnsupportedLocator(i32),
    /// No output channel has been opened for the local locator.
    ChannelNotOpen,
    /// I/O error with underlying cause.
    IoError(std::io::Error),
    /// Send operation failed.
    SendFailed(String),

    // ========================================================================
    // Data Errors
    // ========================================================================
    /// Buffer too small for encoding/decoding.
    BufferTooSmall,
    /// Packet or submessage could not be parsed.
    Malformed(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Configuration
            Error::Config => write!(f, "Configuration error"),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::InvalidLease => write!(f, "Invalid lease duration (must be > 0)"),
            // Liveliness
            Error::ResourceLimitExceeded(msg) => write!(f, "Resource limit exceeded: {}", msg),
            Error::DuplicateWriter => write!(f, "Writer already registered"),
            // Transport
            Error::UnsupportedLocator(kind) => write!(f, "Unsupported locator kind: {}", kind),
            Error::ChannelNotOpen => write!(f, "Output channel not open"),
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::SendFailed(msg) => write!(f, "Send failed: {}", msg),
            // Data
            Error::BufferTooSmall => write!(f, "Buffer too small"),
            Error::Malformed(what) => write!(f, "Malformed packet: {}", what),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e)
    }
}

/// Convenient alias for results using the crate `Error` type.
pub type Result<T> = core::result::Result<T, Error>;
