//! Region layout, loaded from TOML or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! num_queues = 10
//!
//! [internal]
//! name = "internal"
//! base = 0x20020000
//! size = 524288
//! index_capacity = 1024
//!
//! [external]
//! name = "external"
//! base = 0x0C000000
//! size = 8388608
//! index_capacity = 512
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    block::{BLOCK_OVERHEAD, MAX_PAYLOAD, MIN_PAYLOAD},
    error::ConfigError,
};

/// Bytes a region spends on its two sentinels plus the tags of its first
/// block.
pub const REGION_OVERHEAD: u32 = 2 * BLOCK_OVERHEAD;

/// Layout of one memory region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Used in logs and errors.
    pub name: String,
    /// Address of the first byte. Must be 16 byte aligned.
    pub base: u32,
    /// Total bytes, sentinels and tags included.
    pub size: u32,
    /// Maximum number of free spans tracked at once.
    pub index_capacity: usize,
}

impl RegionConfig {
    pub fn new(name: impl Into<String>, base: u32, size: u32, index_capacity: usize) -> Self {
        Self {
            name: name.into(),
            base,
            size,
            index_capacity,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let min = REGION_OVERHEAD + MIN_PAYLOAD;
        let max = MAX_PAYLOAD.saturating_add(REGION_OVERHEAD) & !3;
        if self.size < min || self.size > max || self.size % 4 != 0 {
            return Err(ConfigError::BadSize {
                name: self.name.clone(),
                size: self.size,
                min,
                max,
            });
        }
        if self.base % 16 != 0 {
            return Err(ConfigError::Misaligned {
                name: self.name.clone(),
                base: self.base,
            });
        }
        if self.base.checked_add(self.size).is_none() {
            return Err(ConfigError::Wraps {
                name: self.name.clone(),
            });
        }
        if self.index_capacity == 0 {
            return Err(ConfigError::NoIndexCapacity {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// One past the last byte.
    pub fn end(&self) -> u32 {
        self.base.saturating_add(self.size)
    }
}

/// Layout of the two-region allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Small, fast region. Requests only land here when they opt in.
    pub internal: RegionConfig,
    /// Large region every request falls back to. Must sit below `internal`.
    pub external: RegionConfig,
    /// Number of stealable queues per region.
    #[serde(default = "default_num_queues")]
    pub num_queues: usize,
}

fn default_num_queues() -> usize {
    10
}

impl AllocatorConfig {
    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(format!("TOML serialise error: {e}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.internal.validate()?;
        self.external.validate()?;
        if self.num_queues == 0 {
            return Err(ConfigError::NoQueues);
        }
        // Addresses are routed by comparing against the internal base.
        if self.external.end() > self.internal.base {
            return Err(ConfigError::Overlap);
        }
        Ok(())
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            internal: RegionConfig::new("internal", 0x2002_0000, 512 * 1024, 1024),
            external: RegionConfig::new("external", 0x0C00_0000, 8 * 1024 * 1024, 512),
            num_queues: default_num_queues(),
        }
    }
}
