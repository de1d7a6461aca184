//! Identity decoder

use super::traits::Decoder;
use crate::types::FileDescriptor;
use async_trait::async_trait;

/// Decoder that stores the downloaded bytes unchanged
///
/// Used when the remote files are not encoded.
///
/// ```
/// use patch_dl::collaborators::{Decoder, PassthroughDecoder};
/// use patch_dl::FileDescriptor;
///
/// # #[tokio::main]
/// # async fn main() -> patch_dl::Result<()> {
/// let descriptor = FileDescriptor::new("k", "http://host/a", "a");
/// let decoded = PassthroughDecoder.decode(&descriptor, b"abc".to_vec()).await?;
/// assert_eq!(decoded, b"abc");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDecoder;

#[async_trait]
impl Decoder for PassthroughDecoder {
    async fn decode(&self, _descriptor: &FileDescriptor, raw: Vec<u8>) -> crate::Result<Vec<u8>> {
        Ok(raw)
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}
