//! Traits for the work each stage delegates

use crate::types::FileDescriptor;
use async_trait::async_trait;
use std::path::Path;

/// Payload returned by a [`Transfer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Raw body
    pub bytes: Vec<u8>,
    /// Length announced by the transfer layer (e.g. `Content-Length`), if any
    pub reported_length: Option<u64>,
}

/// Fetches a descriptor's remote payload
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Download the payload behind `descriptor.link`
    ///
    /// # Errors
    ///
    /// Any error is reported as a download failure for this file only.
    async fn fetch(&self, descriptor: &FileDescriptor) -> crate::Result<Fetched>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}

/// Transforms a raw payload into the bytes that get stored
#[async_trait]
pub trait Decoder: Send + Sync {
    /// Decode `raw` for `descriptor`
    async fn decode(&self, descriptor: &FileDescriptor, raw: Vec<u8>) -> crate::Result<Vec<u8>>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}

/// Persists decoded payloads
///
/// Destination folders already exist when `store` is called.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `bytes` to `destination`, replacing any existing file
    async fn store(&self, destination: &Path, bytes: &[u8]) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}
