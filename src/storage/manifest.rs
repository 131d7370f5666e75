//! Store manifest: layout parameters and counts written on every flush

use super::traits::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current on-disk layout version
pub const FORMAT_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "taxonomy.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub format_version: u32,
    pub segment_size: u32,
    pub records: usize,
    pub reverse_pairs: usize,
    pub written_at: DateTime<Utc>,
}

impl StoreManifest {
    pub fn new(segment_size: u32, records: usize, reverse_pairs: usize) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            segment_size,
            records,
            reverse_pairs,
            written_at: Utc::now(),
        }
    }

    /// Read the manifest in `dir`, if one was written
    pub fn load(dir: &Path) -> StorageResult<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    pub fn save(&self, dir: &Path) -> StorageResult<()> {
        let path = dir.join(MANIFEST_FILE);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Reject a store written with a different layout
    pub fn check_compatible(&self, segment_size: u32) -> StorageResult<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(StorageError::IncompatibleLayout(format!(
                "format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            )));
        }
        if self.segment_size != segment_size {
            return Err(StorageError::IncompatibleLayout(format!(
                "segment size {} (configured {})",
                self.segment_size, segment_size
            )));
        }
        Ok(())
    }
}
