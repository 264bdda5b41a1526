use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ToolError, ToolResult};

pub const DEFAULT_ARCHIVE_NAME: &str = "files.zip";
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Settings shared by the `zip` and `unzip` tools.
///
/// Notes:
/// - `compression_level` is a deflate level, 0..=9. `None` means codec default.
/// - Nested expansion stops at `max_nesting_depth`; deeper archives are
///   yielded as plain files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsetConfig {
    /// Archive name used when the caller supplies none.
    pub default_archive_name: String,

    /// Deflate level for new archives.
    pub compression_level: Option<i64>,

    /// Expand `.zip` entries found while extracting.
    pub expand_nested_archives: bool,

    /// Maximum nesting depth when `expand_nested_archives` is on.
    pub max_nesting_depth: usize,

    /// Upper bound on the decompressed size of a single entry.
    pub max_entry_bytes: Option<u64>,

    /// Sniff magic bytes when the entry name gives no content type.
    pub sniff_content: bool,
}

impl Default for ToolsetConfig {
    fn default() -> Self {
        Self {
            default_archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            compression_level: None,
            expand_nested_archives: false,
            max_nesting_depth: 10,
            max_entry_bytes: None,
            sniff_content: false,
        }
    }
}

impl ToolsetConfig {
    pub fn from_json_str(text: &str) -> ToolResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ToolError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ToolResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ToolError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> ToolResult<()> {
        if let Some(level) = self.compression_level {
            if !(0..=9).contains(&level) {
                return Err(ToolError::Config(format!(
                    "compression_level must be between 0 and 9, got {}",
                    level
                )));
            }
        }
        if !self.default_archive_name.ends_with(".zip") || self.default_archive_name.len() <= 4 {
            return Err(ToolError::Config(format!(
                "default_archive_name must be a .zip file name, got '{}'",
                self.default_archive_name
            )));
        }
        Ok(())
    }
}
