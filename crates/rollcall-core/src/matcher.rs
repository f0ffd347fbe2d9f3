//! Identity matching against observed face embeddings.

use thiserror::Error;

use crate::types::Embedding;

/// Default Euclidean-distance tolerance, calibrated for the externally-fixed
/// embedding space. Deployments may tighten or loosen it via configuration.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("embedding dimension mismatch: identity has {expected} dims, observed face has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Strategy for deciding whether a stored identity appears among the faces
/// observed in a group photo.
pub trait Matcher {
    /// Returns true iff any observed embedding is within `tolerance` of
    /// `identity`. Which face matched is irrelevant; only existence matters.
    fn matches(
        &self,
        identity: &Embedding,
        observed: &[Embedding],
        tolerance: f32,
    ) -> Result<bool, MatchError>;
}

/// Euclidean-distance matcher with a distance-threshold decision.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn matches(
        &self,
        identity: &Embedding,
        observed: &[Embedding],
        tolerance: f32,
    ) -> Result<bool, MatchError> {
        // Validate every shape up front: a mismatched vector is a caller
        // contract violation and must fail even if an earlier face matched.
        for face in observed {
            if face.dim() != identity.dim() {
                return Err(MatchError::DimensionMismatch {
                    expected: identity.dim(),
                    actual: face.dim(),
                });
            }
        }

        Ok(observed
            .iter()
            .any(|face| identity.euclidean_distance(face) <= tolerance))
    }
}
