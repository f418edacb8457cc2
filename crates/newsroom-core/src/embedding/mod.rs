//! Semantic embedding service.
//!
//! Produces fixed-dimension vectors for the deduplication engine. Texts
//! shorter than the configured minimum (after cleaning) are not embedded
//! at all and yield `None` rather than an error.

pub mod openai_compat;

use crate::error::EmbeddingError;

/// Trait abstracting the embedding operation.
///
/// `embed` returns `Ok(None)` when the text is too short to produce a
/// meaningful vector. Implementations may cache by text hash.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the display name of this embedder.
    fn name(&self) -> &str;

    /// Embed a text blob into a semantic vector.
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, EmbeddingError>;
}
