//! Configuration types for patch-dl
//!
//! The on-disk format is TOML with kebab-case keys:
//!
//! ```toml
//! thread-usage = true
//! parallel-download = 8
//! parallel-decode = 2
//! parallel-store = 2
//! check-file-size = true
//! check-hash-sum = true
//! compact-logging = false
//! download-path = "./client"
//! exclude-patterns = ['\.bak$']
//! ```

use crate::error::{Error, Result};
use crate::types::Stage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Execution mode and per-stage pool sizes
///
/// Used as a flattened sub-config within [`Config`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConcurrencyConfig {
    /// Run each stage on its own worker pool (default: false = synchronous)
    #[serde(default)]
    pub thread_usage: bool,

    /// Download pool size when `thread_usage` is set (default: 4)
    #[serde(default = "default_parallel_download")]
    pub parallel_download: usize,

    /// Decode pool size when `thread_usage` is set (default: 2)
    #[serde(default = "default_parallel_decode")]
    pub parallel_decode: usize,

    /// Store pool size when `thread_usage` is set (default: 2)
    #[serde(default = "default_parallel_store")]
    pub parallel_store: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            thread_usage: false,
            parallel_download: default_parallel_download(),
            parallel_decode: default_parallel_decode(),
            parallel_store: default_parallel_store(),
        }
    }
}

impl ConcurrencyConfig {
    /// Configured pool size for a stage
    pub fn pool_size(&self, stage: Stage) -> usize {
        match stage {
            Stage::Download => self.parallel_download,
            Stage::Decode => self.parallel_decode,
            Stage::Store => self.parallel_store,
        }
    }
}

/// Advisory verification switches
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VerificationConfig {
    /// Compare decoded length with the declared or reported length (default: true)
    #[serde(default = "default_true")]
    pub check_file_size: bool,

    /// Compare the decoded payload with the declared digest (default: true)
    #[serde(default = "default_true")]
    pub check_hash_sum: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            check_file_size: true,
            check_hash_sum: true,
        }
    }
}

/// Catalog filtering
///
/// Patterns are regular expressions matched against the descriptor's relative
/// path. An empty config accepts every descriptor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FilterConfig {
    /// Accept only paths matching at least one of these patterns
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Reject paths matching any of these patterns
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Accept only these catalog keys
    #[serde(default)]
    pub only_keys: Vec<String>,
}

/// Main configuration for a pipeline run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Execution mode and pool sizes
    #[serde(flatten)]
    pub concurrency: ConcurrencyConfig,

    /// Verification switches
    #[serde(flatten)]
    pub verification: VerificationConfig,

    /// Catalog filters
    #[serde(flatten)]
    pub filter: FilterConfig,

    /// One `<path>: OK` line per file instead of percentage lines (default: false)
    #[serde(default)]
    pub compact_logging: bool,

    /// Root of the local destination tree (default: "downloads")
    #[serde(default = "default_download_path")]
    pub download_path: PathBuf,

    /// Buffer size of the event broadcast channel (default: 1024)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: ConcurrencyConfig::default(),
            verification: VerificationConfig::default(),
            filter: FilterConfig::default(),
            compact_logging: false,
            download_path: default_download_path(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Load and parse a TOML file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config '{}': {}", path.display(), e),
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Whether stages run on worker pools
    pub fn thread_usage(&self) -> bool {
        self.concurrency.thread_usage
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.concurrency.thread_usage {
            for stage in Stage::ALL {
                if self.concurrency.pool_size(stage) == 0 {
                    return Err(Error::config(
                        format!("parallel-{stage}"),
                        format!("{stage} pool size must be at least 1 when thread-usage is enabled"),
                    ));
                }
            }
        }

        if self.event_capacity == 0 {
            return Err(Error::config("event-capacity", "must be at least 1"));
        }

        for (key, patterns) in [
            ("include-patterns", &self.filter.include_patterns),
            ("exclude-patterns", &self.filter.exclude_patterns),
        ] {
            for pattern in patterns {
                if let Err(e) = regex::Regex::new(pattern) {
                    return Err(Error::config(key, format!("invalid pattern '{pattern}': {e}")));
                }
            }
        }

        Ok(())
    }
}

// Default value functions
fn default_parallel_download() -> usize {
    4
}

fn default_parallel_decode() -> usize {
    2
}

fn default_parallel_store() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_download_path() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_event_capacity() -> usize {
    1024
}
