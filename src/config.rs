//! Extraction configuration.
//!
//! ```no_run
//! use uniqframes_rs::ExtractionConfig;
//!
//! let config = ExtractionConfig::new()
//!     .with_interval_sec(0.5)
//!     .with_hash_threshold(8)
//!     .with_output_folder("thumbs");
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ExtractError, Result};

pub const DEFAULT_INTERVAL_SEC: f64 = 0.15;
pub const DEFAULT_HASH_THRESHOLD: u32 = 5;
pub const DEFAULT_OUTPUT_FOLDER: &str = "frames";
pub const DEFAULT_URL_PREFIX: &str = "/frames";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Wall-clock sampling cadence in seconds. Zero samples every frame.
    pub interval_sec: f64,
    /// Fingerprints at most this many bits apart count as the same content.
    pub hash_threshold: u32,
    pub output_folder: PathBuf,
    /// Prepended to every saved filename, keeps concurrent runs apart.
    pub file_prefix: Option<String>,
    pub url_prefix: String,
    #[serde(with = "humantime_serde_opt")]
    pub timeout: Option<Duration>,
}

impl ExtractionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval_sec(mut self, interval_sec: f64) -> Self {
        self.interval_sec = interval_sec;
        self
    }

    pub fn with_hash_threshold(mut self, hash_threshold: u32) -> Self {
        self.hash_threshold = hash_threshold;
        self
    }

    pub fn with_output_folder(mut self, output_folder: impl Into<PathBuf>) -> Self {
        self.output_folder = output_folder.into();
        self
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = Some(prefix.into());
        self
    }

    pub fn with_url_prefix(mut self, url_prefix: impl Into<String>) -> Self {
        self.url_prefix = url_prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.interval_sec.is_finite() || self.interval_sec < 0.0 {
            return Err(ExtractError::InvalidConfig(format!(
                "interval_sec must be a finite number >= 0, got {}",
                self.interval_sec
            )));
        }
        if self.output_folder.as_os_str().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "output_folder must not be empty".to_string(),
            ));
        }
        if let Some(prefix) = &self.file_prefix {
            if prefix.contains(['/', '\\']) {
                return Err(ExtractError::InvalidConfig(format!(
                    "file_prefix must not contain path separators: {prefix:?}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            interval_sec: DEFAULT_INTERVAL_SEC,
            hash_threshold: DEFAULT_HASH_THRESHOLD,
            output_folder: PathBuf::from(DEFAULT_OUTPUT_FOLDER),
            file_prefix: None,
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            timeout: None,
        }
    }
}

/// Reads timeouts written as human durations, e.g. `"90s"` or `"2m 30s"`.
mod humantime_serde_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
