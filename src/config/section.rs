//! `[build]` and `[watch]` sections.
//!
//! # Example
//!
//! ```toml
//! [build]
//! input = "input"     # Source folder (relative to the root)
//! output = "output"   # Output folder (relative to the root)
//! clean = true        # Empty the output folder before every run
//! cache = true        # Reuse module results across runs
//!
//! [watch]
//! debounce_ms = 300   # Quiet period before a triggered run starts
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// `[build]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    pub input: PathBuf,
    pub output: PathBuf,
    pub clean: bool,
    pub cache: bool,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            input: "input".into(),
            output: "output".into(),
            clean: true,
            cache: true,
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub debounce_ms: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

impl WatchSection {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
