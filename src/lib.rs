//! # patch-dl
//!
//! Staged downloader for game client patch sets.
//!
//! A [`Catalog`] lists the files of a patch set. A [`Pipeline`] filters it,
//! prepares the local folders and drives every eligible file through three
//! stages: download, decode and store. Stages either run inline, one file at a
//! time in catalog order, or on independent worker pools when `thread-usage` is
//! enabled.
//!
//! ## Quick Start
//!
//! ```no_run
//! use patch_dl::{Catalog, Collaborators, Config, Pipeline};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         compact_logging: true,
//!         ..Default::default()
//!     };
//!     let catalog = Catalog::from_manifest_file(Path::new("patch.json")).await?;
//!
//!     let pipeline = Pipeline::new(config, Collaborators::standard())?;
//!
//!     // Subscribe to events
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = pipeline.run(catalog).await?;
//!     println!("stored {} of {}", report.stored, report.total);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Patch manifest parsing
pub mod catalog;
/// Transfer, decode and storage implementations
pub mod collaborators;
/// Catalog filtering predicates
pub mod condition;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Pipeline controller (decomposed into focused submodules)
pub mod pipeline;
/// Console line formatting
pub mod progress;
/// Per-stage request queues and worker pools
pub mod stage;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;
/// Length and digest verification
pub mod verify;

// Re-export commonly used types
pub use catalog::Catalog;
pub use collaborators::{
    Collaborators, Decoder, Fetched, FsStorage, HttpTransfer, PassthroughDecoder, Storage,
    Transfer,
};
pub use condition::{Condition, ConditionFilter, ExcludePattern, IncludePattern, KeyList};
pub use config::{ConcurrencyConfig, Config, FilterConfig, VerificationConfig};
pub use error::{Error, Result};
pub use pipeline::{CONSOLE_TARGET, Pipeline};
pub use progress::LogFormat;
pub use types::{BatchReport, Event, FileDescriptor, Stage};

/// Helper function to run a batch with graceful signal handling.
///
/// Runs the pipeline until the batch completes or a termination signal
/// arrives. On a signal the pipeline is stopped and `None` is returned.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use patch_dl::{Catalog, Collaborators, Config, Pipeline, run_with_shutdown};
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = Pipeline::new(Config::default(), Collaborators::standard())?;
///     let catalog = Catalog::from_manifest_file(Path::new("patch.json")).await?;
///
///     // Run with automatic signal handling
///     if let Some(report) = run_with_shutdown(pipeline, catalog).await? {
///         println!("{} stored, {} failed", report.stored, report.failed);
///     }
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(pipeline: Pipeline, catalog: Catalog) -> Result<Option<BatchReport>> {
    tokio::select! {
        result = pipeline.run(catalog) => result.map(Some),
        _ = wait_for_signal() => {
            pipeline.stop().await;
            Ok(None)
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
