//! Embedding extraction boundary.
//!
//! The extraction model itself (detection, landmarking, encoding) lives
//! behind [`EmbeddingExtractor`]; the engine only needs "image in, fixed
//! length vector or no-face out". Two extractions of the same physical
//! face are similar but not bit-identical across model versions, so
//! nothing downstream may compare descriptors for equality.

use std::future::Future;

use image::DynamicImage;
use thiserror::Error;

use rollcall_core::types::Descriptor;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no face found in image")]
    NoFaceFound,
    #[error("image could not be decoded: {0}")]
    InvalidImage(String),
    #[error("extraction backend failed: {0}")]
    Backend(String),
}

/// Opaque capability turning a decoded image into a face descriptor.
///
/// Idempotent; implementations must not hold per-call mutable state.
pub trait EmbeddingExtractor: Send + Sync {
    fn extract(
        &self,
        image: &DynamicImage,
    ) -> impl Future<Output = Result<Descriptor, ExtractError>> + Send;
}

/// Decode raw uploaded bytes, rejecting anything the `image` crate
/// cannot load. This is the input-error boundary: a bad image fails here
/// before any store access happens.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ExtractError> {
    image::load_from_memory(bytes).map_err(|e| ExtractError::InvalidImage(e.to_string()))
}

/// Placeholder backend for deployments where capture clients extract
/// embeddings on-device and submit descriptors directly; image-based
/// entry points report the missing backend instead of guessing.
pub struct NoLocalExtractor;

impl EmbeddingExtractor for NoLocalExtractor {
    async fn extract(&self, _image: &DynamicImage) -> Result<Descriptor, ExtractError> {
        Err(ExtractError::Backend(
            "no local extraction backend configured".into(),
        ))
    }
}
