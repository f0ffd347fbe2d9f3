//! Attendance ledger: the sole writer of the `attendance` table.
//!
//! Re-marking the same (student, date, period) overwrites the earlier row
//! rather than accumulating duplicates; the UNIQUE constraint enforces at
//! most one row per period per student.

use chrono::NaiveDate;
use rollcall_core::{AttendanceRecord, AttendanceSheet, AttendanceStatus, StudentId};
use rusqlite::{params, Row};

use crate::db::Database;
use crate::error::StoreError;

/// Identifier of one attendance row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

/// Aggregate attendance figures for one student.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendanceReport {
    /// Number of periods with a recorded status.
    pub total_periods: u64,
    /// 100 · present / total; 0.0 when nothing is recorded.
    pub percentage: f32,
}

const UPSERT_SQL: &str = "INSERT INTO attendance (student_id, date, period, status)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (student_id, date, period) DO UPDATE SET status = excluded.status";

impl Database {
    /// Record one attendance decision, overwriting any earlier decision for
    /// the same (student, date, period).
    pub fn record(
        &self,
        student_id: StudentId,
        date: NaiveDate,
        period: &str,
        status: AttendanceStatus,
    ) -> Result<RecordId, StoreError> {
        let date = date.to_string();
        self.conn.execute(
            UPSERT_SQL,
            params![student_id.0, date, period, status.as_str()],
        )?;

        // last_insert_rowid is unreliable on the conflict path; look the
        // row up by its natural key.
        let id = self.conn.query_row(
            "SELECT id FROM attendance WHERE student_id = ?1 AND date = ?2 AND period = ?3",
            params![student_id.0, date, period],
            |row| row.get(0),
        )?;
        Ok(RecordId(id))
    }

    /// Persist a full attendance sheet for one (date, period) in a single
    /// transaction: either every decision lands or none does.
    pub fn record_sheet(
        &mut self,
        sheet: &AttendanceSheet,
        date: NaiveDate,
        period: &str,
    ) -> Result<(), StoreError> {
        let date_str = date.to_string();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for id in &sheet.present {
                stmt.execute(params![
                    id.0,
                    date_str,
                    period,
                    AttendanceStatus::Present.as_str()
                ])?;
            }
            for id in &sheet.absent {
                stmt.execute(params![
                    id.0,
                    date_str,
                    period,
                    AttendanceStatus::Absent.as_str()
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!(
            %date,
            period,
            present = sheet.present.len(),
            absent = sheet.absent.len(),
            "attendance sheet recorded"
        );
        Ok(())
    }

    /// Percentage of recorded periods the student was present for.
    /// Defined as 0.0 when nothing has been recorded yet.
    pub fn percentage_attended(&self, student_id: StudentId) -> Result<f32, StoreError> {
        Ok(self.attendance_report(student_id)?.percentage)
    }

    /// Total recorded periods plus attendance percentage for one student.
    pub fn attendance_report(&self, student_id: StudentId) -> Result<AttendanceReport, StoreError> {
        let (total, present): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(status = 'Present'), 0)
             FROM attendance WHERE student_id = ?1",
            params![student_id.0],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let percentage = if total == 0 {
            0.0
        } else {
            100.0 * present as f32 / total as f32
        };
        Ok(AttendanceReport {
            total_periods: total as u64,
            percentage,
        })
    }

    /// Full attendance history for one student, ordered by date then period.
    pub fn history(&self, student_id: StudentId) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT student_id, date, period, status FROM attendance
             WHERE student_id = ?1 ORDER BY date, period",
        )?;
        let records = stmt
            .query_map(params![student_id.0], decode_attendance_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn decode_attendance_row(row: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    let date: String = row.get(1)?;
    let date = date.parse::<NaiveDate>().map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(err))
    })?;

    let status: String = row.get(3)?;
    let status = status.parse::<AttendanceStatus>().map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, err)),
        )
    })?;

    Ok(AttendanceRecord {
        student_id: StudentId(row.get(0)?),
        date,
        period: row.get(2)?,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_percentage_zero_without_rows() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.percentage_attended(StudentId(1)).unwrap(), 0.0);
        assert_eq!(
            db.attendance_report(StudentId(1)).unwrap(),
            AttendanceReport {
                total_periods: 0,
                percentage: 0.0
            }
        );
    }

    #[test]
    fn test_percentage_hundred_when_always_present() {
        let db = Database::open_in_memory().unwrap();
        let id = StudentId(1);
        db.record(id, date("2026-03-02"), "1st Period", AttendanceStatus::Present)
            .unwrap();
        db.record(id, date("2026-03-03"), "1st Period", AttendanceStatus::Present)
            .unwrap();
        assert_eq!(db.percentage_attended(id).unwrap(), 100.0);
    }

    #[test]
    fn test_present_once_absent_once_is_fifty() {
        let db = Database::open_in_memory().unwrap();
        let id = StudentId(1);
        db.record(id, date("2026-03-02"), "P1", AttendanceStatus::Present)
            .unwrap();
        db.record(id, date("2026-03-02"), "P2", AttendanceStatus::Absent)
            .unwrap();

        let report = db.attendance_report(id).unwrap();
        assert_eq!(report.total_periods, 2);
        assert_eq!(report.percentage, 50.0);
    }

    #[test]
    fn test_remark_overwrites_instead_of_accumulating() {
        let db = Database::open_in_memory().unwrap();
        let id = StudentId(1);
        let d = date("2026-03-02");

        let first = db.record(id, d, "P1", AttendanceStatus::Absent).unwrap();
        let second = db.record(id, d, "P1", AttendanceStatus::Present).unwrap();
        assert_eq!(first, second);

        let history = db.history(id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, AttendanceStatus::Present);
    }

    #[test]
    fn test_record_sheet_writes_one_row_per_student() {
        let mut db = Database::open_in_memory().unwrap();
        let sheet = AttendanceSheet {
            present: vec![StudentId(1), StudentId(2)],
            absent: vec![StudentId(3)],
        };

        db.record_sheet(&sheet, date("2026-03-02"), "P1").unwrap();

        for (id, status) in [
            (StudentId(1), AttendanceStatus::Present),
            (StudentId(2), AttendanceStatus::Present),
            (StudentId(3), AttendanceStatus::Absent),
        ] {
            let history = db.history(id).unwrap();
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].status, status);
            assert_eq!(history[0].period, "P1");
        }
    }

    #[test]
    fn test_rerunning_a_sheet_converges_to_one_row_each() {
        let mut db = Database::open_in_memory().unwrap();
        let d = date("2026-03-02");

        let first = AttendanceSheet {
            present: vec![StudentId(1)],
            absent: vec![StudentId(2)],
        };
        db.record_sheet(&first, d, "P1").unwrap();

        // Second run of the same period: student 2 made it into the photo.
        let second = AttendanceSheet {
            present: vec![StudentId(1), StudentId(2)],
            absent: vec![],
        };
        db.record_sheet(&second, d, "P1").unwrap();

        assert_eq!(db.history(StudentId(1)).unwrap().len(), 1);
        let two = db.history(StudentId(2)).unwrap();
        assert_eq!(two.len(), 1);
        assert_eq!(two[0].status, AttendanceStatus::Present);
    }

    #[test]
    fn test_history_ordered_by_date_then_period() {
        let db = Database::open_in_memory().unwrap();
        let id = StudentId(1);
        db.record(id, date("2026-03-03"), "P1", AttendanceStatus::Present)
            .unwrap();
        db.record(id, date("2026-03-02"), "P2", AttendanceStatus::Absent)
            .unwrap();
        db.record(id, date("2026-03-02"), "P1", AttendanceStatus::Present)
            .unwrap();

        let keys: Vec<(NaiveDate, String)> = db
            .history(id)
            .unwrap()
            .into_iter()
            .map(|r| (r.date, r.period))
            .collect();
        assert_eq!(
            keys,
            vec![
                (date("2026-03-02"), "P1".to_string()),
                (date("2026-03-02"), "P2".to_string()),
                (date("2026-03-03"), "P1".to_string()),
            ]
        );
    }

    #[test]
    fn test_history_survives_student_removal() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .register(crate::students::NewStudent {
                class_name: "physics".into(),
                name: "Ada".into(),
                age: 21,
                email: "ada@x".into(),
                image: vec![0x00],
                encoding: None,
            })
            .unwrap();
        db.record(id, date("2026-03-02"), "P1", AttendanceStatus::Present)
            .unwrap();

        db.remove(id).unwrap();
        assert_eq!(db.history(id).unwrap().len(), 1);
    }
}
