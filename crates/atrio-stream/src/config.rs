//! Session tunables.
//!
//! All heuristic constants live here so hosts can override them from their
//! own configuration file. None of these affect correctness, only pacing and
//! the progress estimate.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunable parameters for one [`crate::StreamingSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Assumed total answer length in bytes, for the buffer-length progress
    /// heuristic. Typical answers land between 1500 and 2000 bytes.
    pub assumed_total_len: usize,
    /// Expected number of sections in a full answer, for the section-count
    /// progress heuristic.
    pub expected_section_count: usize,
    /// Coalescing window for buffer-growth events, in milliseconds. Fragments
    /// arriving within this window are decoded in one pass.
    pub debounce_ms: u64,
    /// Minimum interval between published snapshots, in milliseconds.
    /// Independent of the debounce window.
    pub publish_interval_ms: u64,
    /// Consecutive decode/build failures beyond this count set the degraded
    /// state flag. Processing continues regardless.
    pub error_threshold: u32,
    /// Minimum buffer length (after trimming) for the raw-text fallback
    /// section synthesized when finalization finds nothing. Buffers shorter
    /// than this finalize with no sections at all; hosts that want every
    /// non-empty buffer surfaced should set this to 1.
    pub fallback_min_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            assumed_total_len: 1800,
            expected_section_count: 5,
            debounce_ms: 50,
            publish_interval_ms: 100,
            error_threshold: 5,
            fallback_min_len: 10,
        }
    }
}

impl SessionConfig {
    /// Debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Publish rate limit as a [`Duration`].
    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    /// Parses a config from TOML text, with defaults for missing keys.
    ///
    /// File discovery and reading belong to the host; this only interprets
    /// the already-loaded text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid streaming session config")
    }
}
