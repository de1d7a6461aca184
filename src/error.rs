//! Error types for patch-dl
//!
//! Per-file problems (filter rejection, destination preparation, verification
//! mismatches) are reported as events and never surface here. This module covers
//! the failures that abort an operation: bad configuration, unreadable manifests,
//! and collaborator errors raised while a stage is working on a file.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::Stage;

/// Result type alias for patch-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for patch-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "parallel-download")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error raised by the HTTP transfer
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Invalid file catalog manifest
    #[error("invalid manifest: {0}")]
    Manifest(String),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML configuration could not be parsed
    #[error("config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A descriptor's relative path would land outside the download root
    #[error("invalid destination {path}: {reason}")]
    InvalidDestination {
        /// The offending relative path
        path: PathBuf,
        /// Why the path was rejected
        reason: String,
    },

    /// A stage collaborator failed while working on one file
    #[error("{stage} failed for {path}: {reason}")]
    Stage {
        /// Stage that was executing
        stage: Stage,
        /// Link path of the file being processed
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// `Pipeline::run` was called more than once on the same instance
    #[error("pipeline already started")]
    AlreadyStarted,
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Wrap a collaborator error with the stage and file it happened in
    pub fn stage(stage: Stage, path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Stage {
            stage,
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
