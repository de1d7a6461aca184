//! Running a batch, termination detection and shutdown.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::Pipeline;
use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::stage::{Fetch, StageRequest};
use crate::types::{BatchReport, Event, Stage};

impl Pipeline {
    /// Process every eligible descriptor of the catalog and wait for the batch to finish
    ///
    /// The run goes through these steps:
    /// 1. Starts one worker pool per stage when `thread-usage` is enabled
    /// 2. Filters the catalog and prepares destination folders, fixing the
    ///    eligible count before any stage starts
    /// 3. Enqueues each eligible descriptor to the download stage; in synchronous
    ///    mode each one is driven through all three stages before the next
    /// 4. Waits for the halt signal, stops the pools and returns the counters
    ///
    /// A collaborator future that never resolves keeps the batch from completing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] if called twice on the same pipeline.
    pub async fn run(&self, catalog: Catalog) -> Result<BatchReport> {
        if self.state.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        let concurrent = self.config.thread_usage();
        self.state.total.store(catalog.len(), Ordering::SeqCst);

        if concurrent {
            self.start_pools().await;
        }

        let admitted = self.admit(catalog).await;
        self.state.eligible.store(admitted.len(), Ordering::SeqCst);

        tracing::info!(
            total = self.state.total.load(Ordering::SeqCst),
            eligible = admitted.len(),
            skipped = self.state.skipped.load(Ordering::SeqCst),
            concurrent,
            "starting batch"
        );

        if admitted.is_empty() {
            self.check_termination().await;
        }

        for descriptor in admitted {
            if self.halt.is_cancelled() {
                tracing::info!("pipeline stopped, not queueing remaining files");
                break;
            }

            self.stages
                .download
                .enqueue(StageRequest::new(descriptor, Fetch))
                .await;

            if !concurrent {
                self.stages.download.run_one(self).await;
            }
        }

        self.halt.cancelled().await;
        self.shutdown_pools().await;

        let report = self.report();
        tracing::info!(
            stored = report.stored,
            skipped = report.skipped,
            failed = report.failed,
            "batch finished"
        );
        Ok(report)
    }

    /// Stop the pipeline without waiting for the batch
    ///
    /// Files already handed to a worker finish their current stage; everything
    /// still queued is abandoned.
    pub async fn stop(&self) {
        tracing::info!("stopping pipeline");
        self.halt.cancel();
        self.shutdown_pools().await;
    }

    /// Fire the batch-complete signal if every eligible descriptor settled
    ///
    /// Called after each store completion and each stage failure. The settle
    /// counters are incremented before this runs, so the completion that
    /// settles the last descriptor always observes the final count; the
    /// `halted` flag keeps concurrent callers from signalling twice.
    pub(crate) async fn check_termination(&self) {
        let eligible = self.state.eligible.load(Ordering::SeqCst);
        let settled =
            self.state.stored.load(Ordering::SeqCst) + self.state.failed.load(Ordering::SeqCst);

        if settled < eligible {
            return;
        }

        if !self.stages_drained().await {
            tracing::debug!(settled, eligible, "all files settled but a stage queue is not empty");
            return;
        }

        if self
            .state
            .halted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let report = self.report();
        self.emit(Event::BatchComplete { report });
        self.halt.cancel();
    }

    async fn stages_drained(&self) -> bool {
        self.stages.download.queued_len().await == 0
            && self.stages.decode.queued_len().await == 0
            && self.stages.store.queued_len().await == 0
    }

    async fn start_pools(&self) {
        let handler = Arc::new(self.clone());
        let pools = &self.config.concurrency;

        self.stages
            .download
            .init_pool(pools.pool_size(Stage::Download), Arc::clone(&handler), &self.halt)
            .await;
        self.stages
            .decode
            .init_pool(pools.pool_size(Stage::Decode), Arc::clone(&handler), &self.halt)
            .await;
        self.stages
            .store
            .init_pool(pools.pool_size(Stage::Store), handler, &self.halt)
            .await;
    }

    async fn shutdown_pools(&self) {
        self.stages.download.shutdown().await;
        self.stages.decode.shutdown().await;
        self.stages.store.shutdown().await;
    }
}
