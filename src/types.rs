//! Core types for patch-dl

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One remote file in the catalog
///
/// Produced by the catalog and never mutated afterwards. `length` and `hash`
/// are optional: an undeclared length falls back to whatever the transfer layer
/// reports, an undeclared hash makes hash verification log and move on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Catalog key (unique within one catalog)
    pub key: String,
    /// Remote link the transfer layer fetches
    pub link: String,
    /// Destination path relative to the download root, also used in log lines
    pub path: String,
    /// Expected byte length, if the catalog declares one
    #[serde(default)]
    pub length: Option<u64>,
    /// Expected hex digest (MD5 or SHA-256), if the catalog declares one
    #[serde(default)]
    pub hash: Option<String>,
}

impl FileDescriptor {
    /// Create a descriptor without declared length or hash
    pub fn new(key: impl Into<String>, link: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            link: link.into(),
            path: path.into(),
            length: None,
            hash: None,
        }
    }

    /// Declare the expected byte length
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    /// Declare the expected hex digest
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Local file path under `base`
    pub fn destination(&self, base: &Path) -> PathBuf {
        base.join(&self.path)
    }
}

/// Pipeline stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Fetch the remote payload
    Download,
    /// Transform the raw payload
    Decode,
    /// Persist the decoded payload
    Store,
}

impl Stage {
    /// All stages in pipeline order
    pub const ALL: [Stage; 3] = [Stage::Download, Stage::Decode, Stage::Store];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Download => "download",
            Stage::Decode => "decode",
            Stage::Store => "store",
        };
        f.write_str(name)
    }
}

/// Summary of one finished batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Descriptors in the catalog
    pub total: usize,
    /// Descriptors that passed the filter and destination preparation
    pub eligible: usize,
    /// Descriptors that reached the end of the store stage
    pub stored: usize,
    /// Descriptors rejected by the filter or by destination preparation
    pub skipped: usize,
    /// Descriptors whose download, decode or store collaborator failed
    pub failed: usize,
}

impl BatchReport {
    /// True when every eligible descriptor was stored
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.stored == self.eligible
    }
}

/// Event emitted while a batch runs
///
/// Every event except [`Event::Skipped`] maps to exactly one console line; see
/// [`crate::progress::console_line`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Rejected by the condition filter
    Skipped {
        /// Catalog key
        key: String,
        /// Relative path
        path: String,
    },

    /// Destination folders could not be created
    DestinationFailed {
        /// Relative path
        path: String,
        /// Underlying error
        error: String,
    },

    /// Decoded length differs from the declared or reported length
    LengthMismatch {
        /// Relative path
        path: String,
        /// Length the catalog or transfer layer promised
        expected: u64,
        /// Length of the decoded payload
        actual: u64,
    },

    /// Hash verification enabled but the descriptor carries no digest
    HashMissing {
        /// Relative path
        path: String,
    },

    /// Decoded payload does not match the declared digest
    HashMismatch {
        /// Relative path
        path: String,
    },

    /// A file finished the store stage
    Stored {
        /// Relative path (`None` only if the descriptor went missing)
        path: Option<String>,
        /// Stored count including this file
        completed: usize,
        /// Eligible descriptors in the batch
        total: usize,
        /// `floor(completed / total * 100)`
        percent: u8,
    },

    /// A stage collaborator returned an error for this file
    StageFailed {
        /// Relative path
        path: String,
        /// Stage that failed
        stage: Stage,
        /// Error message
        error: String,
    },

    /// Every eligible descriptor settled and all stage queues drained
    BatchComplete {
        /// Final counts
        report: BatchReport,
    },
}
