// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fault injection rules.
//!
//! # Environment Variables
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `HDDS_FAULT_DROP_DATA=1` | drop every packet carrying DATA |
//! | `HDDS_FAULT_DROP_ACKNACK=1` | drop every packet carrying ACKNACK |
//! | `HDDS_FAULT_DROP_HEARTBEAT=1` | drop every packet carrying HEARTBEAT |
//! | `HDDS_FAULT_DROP_PERCENT=<0-100>` | uniform random drop chance per send |
//! | `HDDS_FAULT_DROP_SEQ=1,5,9` | drop DATA with these writer sequence numbers |
//! | `HDDS_FAULT_LOG_LEN=<n>` | drop log capacity |
//! | `HDDS_FAULT_SEED=<u64>` | seed for reproducible random drops |
//!
//! # Example YAML
//!
//! ```yaml
//! drop_data_messages: false
//! drop_percentage: 20
//! sequence_numbers_to_drop: [1, 2, 3]
//! drop_log_length: 32
//! random_seed: 42
//! ```

use std::collections::BTreeSet;

use crate::config::{DEFAULT_DROP_LOG_LENGTH, MAX_DROP_PERCENTAGE};
use crate::{Error, Result, SequenceNumber};

/// Rules applied by `FaultInjectingTransport`.
///
/// Each rule is independent; an all-default config forwards everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultConfig {
    pub drop_data_messages: bool,
    pub drop_acknack_messages: bool,
    pub drop_heartbeat_messages: bool,
    /// Percent chance (0-100) that any send is dropped.
    pub drop_percentage: u8,
    /// DATA writer sequence numbers to drop.
    pub sequence_numbers_to_drop: BTreeSet<SequenceNumber>,
    pub drop_log_length: usize,
    pub random_seed: Option<u64>,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            drop_data_messages: false,
            drop_acknack_messages: false,
            drop_heartbeat_messages: false,
            drop_percentage: 0,
            sequence_numbers_to_drop: BTreeSet::new(),
            drop_log_length: DEFAULT_DROP_LOG_LENGTH,
            random_seed: None,
        }
    }
}

impl FaultConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn drop_data(mut self, enabled: bool) -> Self {
        self.drop_data_messages = enabled;
        self
    }

    #[must_use]
    pub fn drop_acknack(mut self, enabled: bool) -> Self {
        self.drop_acknack_messages = enabled;
        self
    }

    #[must_use]
    pub fn drop_heartbeat(mut self, enabled: bool) -> Self {
        self.drop_heartbeat_messages = enabled;
        self
    }

    /// Random drop chance, clamped to 100.
    #[must_use]
    pub fn drop_percentage(mut self, percent: u8) -> Self {
        self.drop_percentage = percent.min(MAX_DROP_PERCENTAGE);
        self
    }

    #[must_use]
    pub fn drop_sequence_number(mut self, sn: SequenceNumber) -> Self {
        self.sequence_numbers_to_drop.insert(sn);
        self
    }

    #[must_use]
    pub fn drop_sequence_numbers<I>(mut self, sns: I) -> Self
    where
        I: IntoIterator<Item = SequenceNumber>,
    {
        self.sequence_numbers_to_drop.extend(sns);
        self
    }

    #[must_use]
    pub fn drop_log_length(mut self, len: usize) -> Self {
        self.drop_log_length = len;
        self
    }

    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// True if no rule can ever drop a packet.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        !self.drop_data_messages
            && !self.drop_acknack_messages
            && !self.drop_heartbeat_messages
            && self.drop_percentage == 0
            && self.sequence_numbers_to_drop.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.drop_percentage > MAX_DROP_PERCENTAGE {
            return Err(Error::InvalidConfig(format!(
                "drop_percentage {} exceeds {}",
                self.drop_percentage, MAX_DROP_PERCENTAGE
            )));
        }
        Ok(())
    }

    /// Defaults overridden by `HDDS_FAULT_*` variables.
    ///
    /// Unparsable values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("HDDS_FAULT_DROP_DATA") {
            config.drop_data_messages = parse_flag("HDDS_FAULT_DROP_DATA", &v);
        }
        if let Some(v) = lookup("HDDS_FAULT_DROP_ACKNACK") {
            config.drop_acknack_messages = parse_flag("HDDS_FAULT_DROP_ACKNACK", &v);
        }
        if let Some(v) = lookup("HDDS_FAULT_DROP_HEARTBEAT") {
            config.drop_heartbeat_messages = parse_flag("HDDS_FAULT_DROP_HEARTBEAT", &v);
        }
        if let Some(v) = lookup("HDDS_FAULT_DROP_PERCENT") {
            match v.trim().parse::<u8>() {
                Ok(p) if p <= MAX_DROP_PERCENTAGE => config.drop_percentage = p,
                _ => log::warn!("[fault] ignoring HDDS_FAULT_DROP_PERCENT={}", v),
            }
        }
        if let Some(v) = lookup("HDDS_FAULT_DROP_SEQ") {
            for item in v.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match item.parse::<u64>() {
                    Ok(sn) => {
                        config
                            .sequence_numbers_to_drop
                            .insert(SequenceNumber::from_u64(sn));
                    }
                    Err(_) => log::warn!("[fault] ignoring sequence number '{}'", item),
                }
            }
        }
        if let Some(v) = lookup("HDDS_FAULT_LOG_LEN") {
            match v.trim().parse::<usize>() {
                Ok(len) => config.drop_log_length = len,
                Err(_) => log::warn!("[fault] ignoring HDDS_FAULT_LOG_LEN={}", v),
            }
        }
        if let Some(v) = lookup("HDDS_FAULT_SEED") {
            match v.trim().parse::<u64>() {
                Ok(seed) => config.random_seed = Some(seed),
                Err(_) => log::warn!("[fault] ignoring HDDS_FAULT_SEED={}", v),
            }
        }

        config
    }
}

fn parse_flag(key: &str, value: &str) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" | "" => false,
        other => {
            log::warn!("[fault] ignoring {}={}", key, other);
            false
        }
    }
}

// ============================================================================
// YAML loader
// ============================================================================

#[cfg(feature = "config-loaders")]
mod yaml {
    use super::FaultConfig;
    use crate::config::DEFAULT_DROP_LOG_LENGTH;
    use crate::{Error, Result, SequenceNumber};
    use serde::Deserialize;
    use std::fs;
    use std::path::Path;

    /// On-disk form of `FaultConfig`.
    #[derive(Debug, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct YamlFaultConfig {
        drop_data_messages: bool,
        drop_acknack_messages: bool,
        drop_heartbeat_messages: bool,
        drop_percentage: u8,
        sequence_numbers_to_drop: Vec<u64>,
        drop_log_length: usize,
        random_seed: Option<u64>,
    }

    impl Default for YamlFaultConfig {
        fn default() -> Self {
            Self {
                drop_data_messages: false,
                drop_acknack_messages: false,
                drop_heartbeat_messages: false,
                drop_percentage: 0,
                sequence_numbers_to_drop: Vec::new(),
                drop_log_length: DEFAULT_DROP_LOG_LENGTH,
                random_seed: None,
            }
        }
    }

    impl From<YamlFaultConfig> for FaultConfig {
        fn from(doc: YamlFaultConfig) -> Self {
            Self {
                drop_data_messages: doc.drop_data_messages,
                drop_acknack_messages: doc.drop_acknack_messages,
                drop_heartbeat_messages: doc.drop_heartbeat_messages,
                drop_percentage: doc.drop_percentage,
                sequence_numbers_to_drop: doc
                    .sequence_numbers_to_drop
                    .into_iter()
                    .map(SequenceNumber::from_u64)
                    .collect(),
                drop_log_length: doc.drop_log_length,
                random_seed: doc.random_seed,
            }
        }
    }

    impl FaultConfig {
        /// Parse a YAML document; the result is validated.
        pub fn from_yaml_str(yaml: &str) -> Result<Self> {
            let doc: YamlFaultConfig = serde_yaml::from_str(yaml)
                .map_err(|e| Error::InvalidConfig(format!("fault config YAML: {}", e)))?;
            let config = Self::from(doc);
            config.validate()?;
            Ok(config)
        }

        /// Load and parse a YAML file.
        pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
            let content = fs::read_to_string(path.as_ref())?;
            log::debug!("[fault] loading config from {}", path.as_ref().display());
            Self::from_yaml_str(&content)
        }
    }
}
