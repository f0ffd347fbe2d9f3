use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stable identifier of an enrolled student (the store's rowid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub i64);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Face embedding vector (dimensionality fixed by the external extractor,
/// typically 128).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Compute Euclidean distance between two embeddings.
    ///
    /// Both embeddings must have the same dimensionality; callers go through
    /// [`Matcher`](crate::matcher::Matcher), which validates shapes first.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// An enrolled student with identity metadata and face embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: StudentId,
    pub class_name: String,
    pub name: String,
    pub age: u32,
    pub email: String,
    /// Enrollment photo, stored as an opaque blob. Never reprocessed by the
    /// decision engine; skipped when rendering records as JSON.
    #[serde(skip)]
    pub image: Vec<u8>,
    /// None when enrollment detected no face. Such a student can never be
    /// matched and is always resolved Absent.
    pub encoding: Option<Embedding>,
    /// RFC 3339 registration timestamp.
    pub created_at: String,
}

/// Attendance outcome for one student in one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    /// Canonical text form, also used as the `status` column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Present" => Ok(AttendanceStatus::Present),
            "Absent" => Ok(AttendanceStatus::Absent),
            other => Err(format!("unknown attendance status: {other}")),
        }
    }
}

/// One persisted attendance decision: (student, date, period) → status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub period: String,
    pub status: AttendanceStatus,
}
