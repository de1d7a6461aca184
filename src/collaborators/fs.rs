//! Filesystem storage

use super::traits::Storage;
use crate::error::Error;
use async_trait::async_trait;
use std::path::Path;

/// Writes payloads to the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

#[async_trait]
impl Storage for FsStorage {
    async fn store(&self, destination: &Path, bytes: &[u8]) -> crate::Result<()> {
        tokio::fs::write(destination, bytes).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write '{}': {}", destination.display(), e),
            ))
        })
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}
