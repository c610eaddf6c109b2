//! Allocator configuration
//!
//! A [`HeapConfig`] describes one allocator: how many cells it manages,
//! which placement policy it uses and whether it compacts on release. It can
//! be written by hand in TOML:
//!
//! ```toml
//! capacity = 4096
//! policy = "best-fit"
//! compact_on_release = true
//! ```

use crate::allocator::{Allocator, PolicyKind};
use crate::error::{HeapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default number of cells
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapConfig {
    /// Number of cells managed; must be positive
    pub capacity: usize,

    /// Gap selection rule
    pub policy: PolicyKind,

    /// Compact after every release
    pub compact_on_release: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            capacity: DEFAULT_CAPACITY,
            policy: PolicyKind::FirstFit,
            compact_on_release: false,
        }
    }
}

impl HeapConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: HeapConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!("Loading heap config from {:?}", path.as_ref());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate all fields
    ///
    /// Checks:
    /// - Capacity is positive
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(HeapError::Config(
                "capacity must be at least one cell".to_string(),
            ));
        }
        Ok(())
    }

    /// Build an allocator with zeroed in-memory storage
    pub fn build(&self) -> Result<Allocator<PolicyKind>> {
        self.validate()?;
        Ok(Allocator::new(self.capacity, self.policy).compacting(self.compact_on_release))
    }
}
