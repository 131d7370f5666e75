//! Service configuration
//!
//! Read from YAML or JSON depending on the file extension. Every field has a
//! default, so an empty file is a valid in-memory configuration.

use crate::error::{TaxonomyError, TaxonomyResult};
use crate::record::{Sequence, MAX_DESTINATION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    /// Store directory; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,
    /// Origin sequences per segment file
    pub segment_size: u32,
    /// Concept sequence of the is-a relationship type
    pub is_a: Sequence,
    /// Concept sequence of the role group type
    pub role_group: Sequence,
    /// Maximum number of cached snapshot trees
    pub snapshot_cache_capacity: usize,
    /// Origins visited between cancellation checks during a tree build
    pub build_check_interval: usize,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            segment_size: 16384,
            is_a: 1,
            role_group: 2,
            snapshot_cache_capacity: 16,
            build_check_interval: 1024,
        }
    }
}

impl TaxonomyConfig {
    /// In-memory configuration with the given vocabulary
    pub fn in_memory(is_a: Sequence, role_group: Sequence) -> Self {
        Self {
            is_a,
            role_group,
            ..Self::default()
        }
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Load from a `.yaml`/`.yml` or `.json` file
    pub fn load(path: &Path) -> TaxonomyResult<Self> {
        let invalid = |reason: String| TaxonomyError::Config {
            path: path.to_path_buf(),
            reason,
        };
        let text = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text).map_err(|e| invalid(e.to_string()))?,
            Some("json") => serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?,
            other => return Err(invalid(format!("unsupported extension {:?}", other))),
        };
        config.validate().map_err(invalid)?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.segment_size == 0 {
            return Err("segment_size must be positive".into());
        }
        if self.build_check_interval == 0 {
            return Err("build_check_interval must be positive".into());
        }
        if self.is_a > MAX_DESTINATION || self.role_group > MAX_DESTINATION {
            return Err(format!("vocabulary sequences must not exceed {}", MAX_DESTINATION));
        }
        if self.is_a == self.role_group {
            return Err("is_a and role_group must differ".into());
        }
        Ok(())
    }
}

/// Default store directory (`<data dir>/taxon`)
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"))
        .join("taxon")
}
