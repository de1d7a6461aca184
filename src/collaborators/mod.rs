//! External collaborators driven by the pipeline stages
//!
//! Each stage delegates its actual work to a trait object so the pipeline can be
//! wired to real network and filesystem implementations or to test doubles:
//!
//! - [`Transfer`]: fetch the remote payload ([`HttpTransfer`])
//! - [`Decoder`]: transform the raw payload ([`PassthroughDecoder`])
//! - [`Storage`]: persist the decoded payload ([`FsStorage`])
//!
//! ## Usage
//!
//! ```no_run
//! use patch_dl::collaborators::{Collaborators, FsStorage, HttpTransfer, PassthroughDecoder};
//! use std::sync::Arc;
//!
//! let collaborators = Collaborators {
//!     transfer: Arc::new(HttpTransfer::new()),
//!     decoder: Arc::new(PassthroughDecoder),
//!     storage: Arc::new(FsStorage),
//! };
//! ```

mod fs;
mod http;
mod passthrough;
mod traits;

pub use fs::FsStorage;
pub use http::HttpTransfer;
pub use passthrough::PassthroughDecoder;
pub use traits::{Decoder, Fetched, Storage, Transfer};

use std::sync::Arc;

/// The three collaborators a pipeline needs
#[derive(Clone)]
pub struct Collaborators {
    /// Download stage work
    pub transfer: Arc<dyn Transfer>,
    /// Decode stage work
    pub decoder: Arc<dyn Decoder>,
    /// Store stage work
    pub storage: Arc<dyn Storage>,
}

impl Collaborators {
    /// HTTP download, identity decode, filesystem store
    pub fn standard() -> Self {
        Self {
            transfer: Arc::new(HttpTransfer::new()),
            decoder: Arc::new(PassthroughDecoder),
            storage: Arc::new(FsStorage),
        }
    }
}
