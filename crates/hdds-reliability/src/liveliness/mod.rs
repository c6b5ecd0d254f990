// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer liveliness tracking.
//!
//! Each tracked writer holds a lease. A writer is alive while it keeps
//! asserting within that lease, and becomes not-alive once the lease
//! elapses. One timer per [`LivelinessManager`] is armed for the soonest
//! expiration; listeners hear about transitions in both directions.

mod data;
mod kind;
mod listener;
mod manager;
mod policy;
mod timer;


pub use data::{LivelinessData, WriterStatus};
pub use kind::LivelinessKind;
pub use listener::{ClosureLivelinessListener, LivelinessListener};
pub use manager::{LivelinessManager, LivelinessManagerBuilder, LivelinessManagerConfig};
pub use policy::{is_infinite_lease, Liveliness, INFINITE_LEASE};
