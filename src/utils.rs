//! Utility functions for destination paths

use crate::error::{Error, Result};
use crate::types::FileDescriptor;
use std::path::{Component, Path, PathBuf};

/// Create every missing directory level needed to later write the descriptor's
/// file under `base`, and return the file's full destination path
///
/// The file itself is not created. Calling this again for an existing directory
/// succeeds.
///
/// # Errors
///
/// Returns [`Error::InvalidDestination`] if the relative path is empty, absolute
/// or climbs out of `base`, and [`Error::Io`] if a directory cannot be created.
pub async fn prepare_destination(base: &Path, descriptor: &FileDescriptor) -> Result<PathBuf> {
    let relative = Path::new(&descriptor.path);
    validate_relative(relative)?;

    let destination = descriptor.destination(base);
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create directory '{}': {}", parent.display(), e),
            ))
        })?;
    }

    Ok(destination)
}

fn validate_relative(relative: &Path) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidDestination {
        path: relative.to_path_buf(),
        reason: reason.to_string(),
    };

    if relative.as_os_str().is_empty() {
        return Err(invalid("path is empty"));
    }

    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err(invalid("path escapes the download root")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("path must be relative"));
            }
        }
    }

    Ok(())
}
