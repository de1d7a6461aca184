//! Stage handlers and the completion callbacks that chain the stages.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::Pipeline;
use crate::collaborators::Fetched;
use crate::error::Error;
use crate::progress;
use crate::stage::{Decoded, Downloaded, Fetch, StageHandler, StageRequest};
use crate::types::{Event, FileDescriptor, Stage};
use crate::verify::{self, HashCheck, LengthCheck};

#[async_trait]
impl StageHandler<Fetch> for Pipeline {
    async fn handle(&self, request: StageRequest<Fetch>) {
        match self.collaborators.transfer.fetch(&request.descriptor).await {
            Ok(fetched) => self.on_download_complete(request, fetched).await,
            Err(e) => self.on_stage_failed(Stage::Download, &request.descriptor, e).await,
        }
    }
}

#[async_trait]
impl StageHandler<Downloaded> for Pipeline {
    async fn handle(&self, request: StageRequest<Downloaded>) {
        let StageRequest {
            descriptor,
            payload: Downloaded {
                bytes,
                reported_length,
            },
        } = request;

        match self.collaborators.decoder.decode(&descriptor, bytes).await {
            Ok(decoded) => {
                self.on_decode_complete(descriptor, decoded, reported_length)
                    .await
            }
            Err(e) => self.on_stage_failed(Stage::Decode, &descriptor, e).await,
        }
    }
}

#[async_trait]
impl StageHandler<Decoded> for Pipeline {
    async fn handle(&self, request: StageRequest<Decoded>) {
        let destination = request.descriptor.destination(&self.config.download_path);

        match self
            .collaborators
            .storage
            .store(&destination, &request.payload.bytes)
            .await
        {
            Ok(()) => self.on_store_complete(Some(request.descriptor.as_ref())).await,
            Err(e) => self.on_stage_failed(Stage::Store, &request.descriptor, e).await,
        }
    }
}

impl Pipeline {
    /// Hand the downloaded payload to the decode stage
    pub(crate) async fn on_download_complete(&self, request: StageRequest<Fetch>, fetched: Fetched) {
        tracing::debug!(path = request.path(), bytes = fetched.bytes.len(), "downloaded");

        let next = request.advance(Downloaded {
            bytes: fetched.bytes,
            reported_length: fetched.reported_length,
        });
        self.stages.decode.enqueue(next).await;

        if !self.config.thread_usage() {
            self.stages.decode.run_one(self).await;
        }
    }

    /// Run the advisory checks, then hand the decoded payload to the store stage
    pub(crate) async fn on_decode_complete(
        &self,
        descriptor: Arc<FileDescriptor>,
        decoded: Vec<u8>,
        reported_length: Option<u64>,
    ) {
        self.verify_decoded(&descriptor, &decoded, reported_length);

        self.stages
            .store
            .enqueue(StageRequest::new(descriptor, Decoded { bytes: decoded }))
            .await;

        if !self.config.thread_usage() {
            self.stages.store.run_one(self).await;
        }
    }

    /// Count the stored file, report progress and check for batch completion
    pub(crate) async fn on_store_complete(&self, descriptor: Option<&FileDescriptor>) {
        let completed = self.state.stored.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.state.eligible.load(Ordering::SeqCst);

        self.emit(Event::Stored {
            path: descriptor.map(|d| d.path.clone()),
            completed,
            total,
            percent: progress::percent(completed, total),
        });

        self.check_termination().await;
    }

    /// Settle a descriptor whose collaborator failed
    pub(crate) async fn on_stage_failed(&self, stage: Stage, descriptor: &FileDescriptor, error: Error) {
        self.state.failed.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(%stage, key = %descriptor.key, link = %descriptor.link, "stage failed");

        self.emit(Event::StageFailed {
            path: descriptor.path.clone(),
            stage,
            error: error.to_string(),
        });

        self.check_termination().await;
    }

    /// Length and hash checks; mismatches are reported, never enforced
    fn verify_decoded(&self, descriptor: &FileDescriptor, decoded: &[u8], reported_length: Option<u64>) {
        let checks = &self.config.verification;

        if checks.check_file_size {
            match verify::length_check(decoded.len() as u64, descriptor.length, reported_length) {
                LengthCheck::Match => {}
                LengthCheck::Mismatch { expected, actual } => {
                    self.emit(Event::LengthMismatch {
                        path: descriptor.path.clone(),
                        expected,
                        actual,
                    });
                }
                LengthCheck::Unknown => {
                    tracing::debug!(path = %descriptor.path, "no expected length, size check skipped");
                }
            }
        }

        if checks.check_hash_sum {
            match verify::hash_check(decoded, descriptor.hash.as_deref()) {
                HashCheck::Match => {}
                HashCheck::Missing => self.emit(Event::HashMissing {
                    path: descriptor.path.clone(),
                }),
                HashCheck::Mismatch => self.emit(Event::HashMismatch {
                    path: descriptor.path.clone(),
                }),
            }
        }
    }
}
