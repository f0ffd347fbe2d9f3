//! Roster-wide attendance resolution.
//!
//! Pure decision logic: consumes the roster and the embeddings observed in
//! a group photo, produces a present/absent partition. Persisting the
//! partition is the caller's job (see the ledger in rollcall-store), which
//! keeps resolution deterministic and testable without a database.

use crate::matcher::{EuclideanMatcher, MatchError, Matcher};
use crate::types::{Embedding, StudentId, StudentRecord};

/// Present/absent partition of one roster for one attendance event.
///
/// Every roster member lands in exactly one of the two sets, in roster
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceSheet {
    pub present: Vec<StudentId>,
    pub absent: Vec<StudentId>,
}

impl AttendanceSheet {
    /// Total number of students the sheet covers.
    pub fn len(&self) -> usize {
        self.present.len() + self.absent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty() && self.absent.is_empty()
    }
}

/// Resolves a roster against observed faces using a pluggable matcher.
pub struct AttendanceResolver<M = EuclideanMatcher> {
    matcher: M,
}

impl AttendanceResolver<EuclideanMatcher> {
    pub fn new() -> Self {
        Self {
            matcher: EuclideanMatcher,
        }
    }
}

impl Default for AttendanceResolver<EuclideanMatcher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Matcher> AttendanceResolver<M> {
    pub fn with_matcher(matcher: M) -> Self {
        Self { matcher }
    }

    /// Partition `roster` into present and absent against `observed`.
    ///
    /// A student with no stored identity vector is unresolvable and is
    /// classified Absent: there is nothing to match against. This is a
    /// deliberate policy, logged per student, not a silent fallthrough.
    pub fn resolve(
        &self,
        roster: &[StudentRecord],
        observed: &[Embedding],
        tolerance: f32,
    ) -> Result<AttendanceSheet, MatchError> {
        let mut sheet = AttendanceSheet::default();

        for student in roster {
            match &student.encoding {
                None => {
                    tracing::warn!(
                        student = %student.id,
                        name = %student.name,
                        "no stored identity vector; classifying absent"
                    );
                    sheet.absent.push(student.id);
                }
                Some(identity) => {
                    if self.matcher.matches(identity, observed, tolerance)? {
                        sheet.present.push(student.id);
                    } else {
                        sheet.absent.push(student.id);
                    }
                }
            }
        }

        tracing::debug!(
            roster = roster.len(),
            present = sheet.present.len(),
            absent = sheet.absent.len(),
            "attendance resolved"
        );

        Ok(sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: i64, encoding: Option<Vec<f32>>) -> StudentRecord {
        StudentRecord {
            id: StudentId(id),
            class_name: "physics".into(),
            name: format!("student-{id}"),
            age: 20,
            email: format!("s{id}@example.edu"),
            image: Vec::new(),
            encoding: encoding.map(Embedding::new),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_partition_is_complete_and_disjoint() {
        let roster = vec![
            student(1, Some(vec![1.0, 0.0])),
            student(2, Some(vec![0.0, 1.0])),
            student(3, None),
        ];
        let observed = vec![Embedding::new(vec![1.0, 0.0])];

        let sheet = AttendanceResolver::new()
            .resolve(&roster, &observed, 0.1)
            .unwrap();

        assert_eq!(sheet.len(), roster.len());
        for s in &roster {
            let in_present = sheet.present.contains(&s.id);
            let in_absent = sheet.absent.contains(&s.id);
            assert!(in_present ^ in_absent, "student {} not partitioned", s.id);
        }
    }

    #[test]
    fn test_scenario_two_students_one_face() {
        // roster = [A(vector=[1,0]), B(vector=[0,1])], observed = [[1,0]],
        // tolerance = 0.1 => present = {A}, absent = {B}
        let roster = vec![
            student(1, Some(vec![1.0, 0.0])),
            student(2, Some(vec![0.0, 1.0])),
        ];
        let observed = vec![Embedding::new(vec![1.0, 0.0])];

        let sheet = AttendanceResolver::new()
            .resolve(&roster, &observed, 0.1)
            .unwrap();

        assert_eq!(sheet.present, vec![StudentId(1)]);
        assert_eq!(sheet.absent, vec![StudentId(2)]);
    }

    #[test]
    fn test_empty_observed_marks_everyone_absent() {
        let roster = vec![
            student(1, Some(vec![1.0, 0.0])),
            student(2, Some(vec![0.0, 1.0])),
        ];

        let sheet = AttendanceResolver::new().resolve(&roster, &[], 0.6).unwrap();

        assert!(sheet.present.is_empty());
        assert_eq!(sheet.absent, vec![StudentId(1), StudentId(2)]);
    }

    #[test]
    fn test_empty_roster_yields_empty_sheet() {
        let observed = vec![Embedding::new(vec![1.0, 0.0])];
        let sheet = AttendanceResolver::new().resolve(&[], &observed, 0.6).unwrap();
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_student_without_encoding_is_absent() {
        let roster = vec![student(7, None)];
        // Even a photo full of faces cannot match a missing identity vector.
        let observed = vec![Embedding::new(vec![0.0, 0.0])];

        let sheet = AttendanceResolver::new()
            .resolve(&roster, &observed, 100.0)
            .unwrap();

        assert_eq!(sheet.absent, vec![StudentId(7)]);
    }

    #[test]
    fn test_identical_vector_present_at_zero_tolerance() {
        let roster = vec![student(1, Some(vec![0.25, -0.5, 0.75]))];
        let observed = vec![Embedding::new(vec![0.25, -0.5, 0.75])];

        let sheet = AttendanceResolver::new()
            .resolve(&roster, &observed, 0.0)
            .unwrap();

        assert_eq!(sheet.present, vec![StudentId(1)]);
    }

    #[test]
    fn test_dimension_mismatch_propagates() {
        let roster = vec![student(1, Some(vec![1.0, 0.0, 0.0]))];
        let observed = vec![Embedding::new(vec![1.0, 0.0])];

        let result = AttendanceResolver::new().resolve(&roster, &observed, 0.6);
        assert!(matches!(result, Err(MatchError::DimensionMismatch { .. })));
    }
}
