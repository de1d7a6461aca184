//! Admission: condition filtering and destination preparation.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::Pipeline;
use crate::catalog::Catalog;
use crate::types::{Event, FileDescriptor};
use crate::utils::prepare_destination;

impl Pipeline {
    /// Filter the catalog and prepare destination folders
    ///
    /// Returns the eligible descriptors in catalog order. Every rejected
    /// descriptor increments the skip tally exactly once and never reaches a
    /// stage queue.
    pub(crate) async fn admit(&self, catalog: Catalog) -> Vec<Arc<FileDescriptor>> {
        let mut admitted = Vec::with_capacity(catalog.len());

        for descriptor in catalog {
            if !self.filter.accepts(&descriptor) {
                self.state.skipped.fetch_add(1, Ordering::SeqCst);
                self.emit(Event::Skipped {
                    key: descriptor.key,
                    path: descriptor.path,
                });
                continue;
            }

            match prepare_destination(&self.config.download_path, &descriptor).await {
                Ok(destination) => {
                    tracing::trace!(key = %descriptor.key, ?destination, "admitted");
                    admitted.push(Arc::new(descriptor));
                }
                Err(e) => {
                    self.state.skipped.fetch_add(1, Ordering::SeqCst);
                    tracing::debug!(key = %descriptor.key, error = %e, "destination preparation failed");
                    self.emit(Event::DestinationFailed {
                        path: descriptor.path,
                        error: e.to_string(),
                    });
                }
            }
        }

        admitted
    }
}
