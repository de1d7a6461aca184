//! Pipeline controller split into focused submodules.
//!
//! The `Pipeline` struct and its methods are organized by concern:
//! - [`admission`] - Condition filtering and destination preparation
//! - [`callbacks`] - Stage handlers and completion callbacks
//! - [`lifecycle`] - Running a batch, termination detection and shutdown
//!
//! Each file descriptor moves through Download, Decode and Store exactly once.
//! In synchronous mode every completion callback drives the next stage inline, so
//! files finish in catalog order; with `thread-usage` each stage has its own
//! worker pool and completions hand requests to the next stage's queue.

mod admission;
mod callbacks;
mod lifecycle;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::collaborators::Collaborators;
use crate::condition::ConditionFilter;
use crate::config::Config;
use crate::error::Result;
use crate::progress::{self, LogFormat};
use crate::stage::{Decoded, Downloaded, Fetch, StageManager};
use crate::types::{BatchReport, Event, Stage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// tracing target for the user-facing console lines
pub const CONSOLE_TARGET: &str = "patch_dl::console";

/// One queue (and optional pool) per stage
#[derive(Clone)]
pub(crate) struct Stages {
    pub(crate) download: StageManager<Fetch>,
    pub(crate) decode: StageManager<Downloaded>,
    pub(crate) store: StageManager<Decoded>,
}

impl Stages {
    fn new() -> Self {
        Self {
            download: StageManager::new(Stage::Download),
            decode: StageManager::new(Stage::Decode),
            store: StageManager::new(Stage::Store),
        }
    }
}

/// Batch counters shared by every stage worker
#[derive(Default)]
pub(crate) struct PipelineState {
    /// Descriptors in the catalog
    pub(crate) total: AtomicUsize,
    /// Descriptors admitted to the download stage; set once before any stage runs
    pub(crate) eligible: AtomicUsize,
    /// Store completions
    pub(crate) stored: AtomicUsize,
    /// Filter rejections and destination failures
    pub(crate) skipped: AtomicUsize,
    /// Collaborator failures
    pub(crate) failed: AtomicUsize,
    /// `run` has been called
    pub(crate) started: AtomicBool,
    /// The batch-complete signal has fired
    pub(crate) halted: AtomicBool,
}

/// Pipeline controller (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) config: Arc<Config>,
    pub(crate) collaborators: Collaborators,
    pub(crate) filter: Arc<ConditionFilter>,
    pub(crate) stages: Stages,
    pub(crate) state: Arc<PipelineState>,
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Cancelled exactly once, when the batch completes or the pipeline is stopped
    pub(crate) halt: CancellationToken,
    pub(crate) format: LogFormat,
}

impl Pipeline {
    /// Create a pipeline with the conditions described by `config.filter`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the configuration is invalid.
    pub fn new(config: Config, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let filter = ConditionFilter::from_config(&config.filter)?;
        Ok(Self::with_filter(config, collaborators, filter))
    }

    /// Create a pipeline with an explicit condition filter
    ///
    /// The configuration is not validated; use [`Pipeline::new`] unless the
    /// config is known to be valid.
    pub fn with_filter(config: Config, collaborators: Collaborators, filter: ConditionFilter) -> Self {
        let (event_tx, _rx) = broadcast::channel(config.event_capacity.max(1));

        tracing::debug!(
            transfer = collaborators.transfer.name(),
            decoder = collaborators.decoder.name(),
            storage = collaborators.storage.name(),
            conditions = filter.len(),
            thread_usage = config.thread_usage(),
            "pipeline created"
        );

        Self {
            format: LogFormat::from_compact(config.compact_logging),
            config: Arc::new(config),
            collaborators,
            filter: Arc::new(filter),
            stages: Stages::new(),
            state: Arc::new(PipelineState::default()),
            event_tx,
            halt: CancellationToken::new(),
        }
    }

    /// Subscribe to pipeline events
    ///
    /// Multiple subscribers are supported. A subscriber that falls behind by more
    /// than `event-capacity` events receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Snapshot of the batch counters
    pub fn report(&self) -> BatchReport {
        BatchReport {
            total: self.state.total.load(Ordering::SeqCst),
            eligible: self.state.eligible.load(Ordering::SeqCst),
            stored: self.state.stored.load(Ordering::SeqCst),
            skipped: self.state.skipped.load(Ordering::SeqCst),
            failed: self.state.failed.load(Ordering::SeqCst),
        }
    }

    /// Requests queued or in flight for a stage
    pub fn pending(&self, stage: Stage) -> usize {
        match stage {
            Stage::Download => self.stages.download.pending_count(),
            Stage::Decode => self.stages.decode.pending_count(),
            Stage::Store => self.stages.store.pending_count(),
        }
    }

    /// Token cancelled when the batch completes or the pipeline is stopped
    pub fn halted(&self) -> CancellationToken {
        self.halt.clone()
    }

    /// Log the event's console line and broadcast it
    pub(crate) fn emit(&self, event: Event) {
        if let Some(line) = progress::console_line(&event, self.format) {
            match &event {
                Event::DestinationFailed { .. }
                | Event::LengthMismatch { .. }
                | Event::HashMissing { .. }
                | Event::HashMismatch { .. } => {
                    tracing::warn!(target: CONSOLE_TARGET, "{line}");
                }
                Event::StageFailed { .. } => tracing::error!(target: CONSOLE_TARGET, "{line}"),
                _ => tracing::info!(target: CONSOLE_TARGET, "{line}"),
            }
        }

        // send() only fails without subscribers
        self.event_tx.send(event).ok();
    }
}
