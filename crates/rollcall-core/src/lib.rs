//! rollcall-core — Attendance decision engine.
//!
//! Matches stored per-student face embeddings against embeddings observed
//! in a group photo and partitions the roster into present and absent.
//! Pure decision logic: no I/O, no persistence, no image processing.

pub mod extractor;
pub mod matcher;
pub mod resolver;
pub mod types;

pub use extractor::{EmbeddingExtractor, ExtractError};
pub use matcher::{EuclideanMatcher, MatchError, Matcher, DEFAULT_TOLERANCE};
pub use resolver::{AttendanceResolver, AttendanceSheet};
pub use types::{
    AttendanceRecord, AttendanceStatus, Embedding, StudentId, StudentRecord,
};
