use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for content-addressable file handles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Directory for download fallback copies. `None` uses the system
    /// temp directory.
    pub temp_dir: Option<PathBuf>,
    /// File name prefix for download fallback copies.
    pub temp_prefix: String,
    /// Buffer size in bytes for stream copies.
    pub copy_buffer_size: usize,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            temp_prefix: "content-addressable".into(),
            copy_buffer_size: 64 * 1024,
        }
    }
}

impl FileConfig {
    /// Parse a JSON config document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
