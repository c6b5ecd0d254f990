// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fmt;

/// LIVELINESS QoS kinds (DDS v1.4 Sec.2.2.3.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LivelinessKind {
    /// Any activity of the participant asserts all its automatic writers.
    #[default]
    Automatic,
    /// Application must assert per participant.
    ManualByParticipant,
    /// Application must assert per writer/topic.
    ManualByTopic,
}

impl LivelinessKind {
    /// True if asserting one writer of this kind asserts every writer of
    /// the same kind in the same participant.
    #[must_use]
    pub fn is_participant_wide(self) -> bool {
        matches!(self, Self::Automatic | Self::ManualByParticipant)
    }
}

impl fmt::Display for LivelinessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Automatic => "AUTOMATIC",
            Self::ManualByParticipant => "MANUAL_BY_PARTICIPANT",
            Self::ManualByTopic => "MANUAL_BY_TOPIC",
        };
        f.write_str(s)
    }
}
