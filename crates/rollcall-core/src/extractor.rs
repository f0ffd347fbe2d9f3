//! Seam to the external face-embedding extractor.
//!
//! Embedding extraction (detection + recognition model) lives outside this
//! workspace; the engine consumes it through this trait only.

use thiserror::Error;

use crate::types::Embedding;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extractor io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("extractor process failed: {0}")]
    Process(String),
    #[error("malformed extractor output: {0}")]
    Malformed(String),
}

/// Produces one embedding per face detected in an image.
pub trait EmbeddingExtractor {
    /// Extract embeddings from raw image bytes.
    ///
    /// An empty vec means no face was detected — a valid outcome, never an
    /// error. Callers decide policy (e.g. enrollment without a vector).
    fn extract(&self, image: &[u8]) -> Result<Vec<Embedding>, ExtractError>;
}
