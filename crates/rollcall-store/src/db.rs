//! Database handle, schema, and the embedding blob codec.

use std::path::Path;

use rollcall_core::Embedding;
use rusqlite::Connection;

use crate::error::StoreError;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS students (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    class_name    TEXT NOT NULL,
    name          TEXT NOT NULL,
    age           INTEGER NOT NULL,
    email         TEXT NOT NULL,
    image         BLOB NOT NULL,
    face_encoding BLOB,
    created_at    TEXT NOT NULL,
    UNIQUE (class_name, email)
);
CREATE INDEX IF NOT EXISTS idx_students_class_name ON students (class_name);

CREATE TABLE IF NOT EXISTS attendance (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id INTEGER NOT NULL,
    date       TEXT NOT NULL,
    period     TEXT NOT NULL,
    status     TEXT NOT NULL,
    UNIQUE (student_id, date, period)
);
CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance (student_id);
";

/// Owns the SQLite connection for both the roster and the ledger.
///
/// The path is explicit configuration, opened once and closed when the
/// handle drops. Attendance rows deliberately carry no foreign key to
/// `students`: removing a student keeps the audit history.
pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        tracing::info!(path = %path.display(), "database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database. Used by tests and diagnostics.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Delete every student and every attendance row, atomically.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let students = tx.execute("DELETE FROM students", [])?;
        let attendance = tx.execute("DELETE FROM attendance", [])?;
        tx.commit()?;
        tracing::warn!(students, attendance, "database reset; all rows deleted");
        Ok(())
    }
}

/// Encode an embedding as a little-endian f32 blob.
pub(crate) fn encode_embedding(embedding: &Embedding) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.values.len() * 4);
    for value in &embedding.values {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Decode a little-endian f32 blob back into an embedding.
pub(crate) fn decode_embedding(blob: &[u8]) -> Result<Embedding, StoreError> {
    if blob.len() % 4 != 0 {
        return Err(StoreError::CorruptEncoding(format!(
            "blob length {} is not a multiple of 4",
            blob.len()
        )));
    }

    let values = blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    Ok(Embedding { values })
}
