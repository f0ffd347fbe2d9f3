//! Roster operations: register, fetch, list, patch, remove.

use chrono::Utc;
use rollcall_core::{Embedding, StudentId, StudentRecord};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{decode_embedding, encode_embedding, Database};
use crate::error::{is_unique_violation, StoreError};

/// Input for a new registration. The identity vector is `None` when the
/// enrollment photo yielded no face; such a student is stored but can never
/// be matched (always resolved Absent).
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub class_name: String,
    pub name: String,
    pub age: u32,
    pub email: String,
    pub image: Vec<u8>,
    pub encoding: Option<Embedding>,
}

/// Partial update: only supplied fields change, everything else is kept.
/// A new `image` arrives together with a freshly extracted `encoding`
/// (re-registration of the identity vector).
#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub email: Option<String>,
    pub image: Option<Vec<u8>>,
    pub encoding: Option<Embedding>,
}

impl Database {
    /// Register a student. Fails with [`StoreError::DuplicateIdentity`] when
    /// the email already exists in the class; nothing is written in that
    /// case (single INSERT, no partial row).
    pub fn register(&self, new: NewStudent) -> Result<StudentId, StoreError> {
        let created_at = Utc::now().to_rfc3339();
        let encoding_blob = new.encoding.as_ref().map(encode_embedding);

        let result = self.conn.execute(
            "INSERT INTO students (class_name, name, age, email, image, face_encoding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new.class_name,
                new.name,
                new.age,
                new.email,
                new.image,
                encoding_blob,
                created_at
            ],
        );

        match result {
            Ok(_) => {
                let id = StudentId(self.conn.last_insert_rowid());
                tracing::info!(
                    student = %id,
                    class = %new.class_name,
                    has_encoding = new.encoding.is_some(),
                    "student registered"
                );
                Ok(id)
            }
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateIdentity {
                class_name: new.class_name,
                email: new.email,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch one student by id.
    pub fn get(&self, id: StudentId) -> Result<Option<StudentRecord>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, class_name, name, age, email, image, face_encoding, created_at
                 FROM students WHERE id = ?1",
                params![id.0],
                decode_student_row,
            )
            .optional()
            .map_err(StoreError::from)
    }

    /// All students of one class, in registration (id) order.
    pub fn list_roster(&self, class_name: &str) -> Result<Vec<StudentRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, class_name, name, age, email, image, face_encoding, created_at
             FROM students WHERE class_name = ?1 ORDER BY id",
        )?;
        let roster = stmt
            .query_map(params![class_name], decode_student_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(roster)
    }

    /// Patch a student: merge the supplied fields into the stored row.
    pub fn update(&mut self, id: StudentId, patch: StudentPatch) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;

        let current = tx
            .query_row(
                "SELECT id, class_name, name, age, email, image, face_encoding, created_at
                 FROM students WHERE id = ?1",
                params![id.0],
                decode_student_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound { id })?;

        let name = patch.name.unwrap_or(current.name);
        let age = patch.age.unwrap_or(current.age);
        let email = patch.email.unwrap_or(current.email);
        let image = patch.image.unwrap_or(current.image);
        let encoding = patch.encoding.or(current.encoding);
        let encoding_blob = encoding.as_ref().map(encode_embedding);

        let result = tx.execute(
            "UPDATE students SET name = ?2, age = ?3, email = ?4, image = ?5, face_encoding = ?6
             WHERE id = ?1",
            params![id.0, name, age, email, image, encoding_blob],
        );

        match result {
            Ok(_) => {
                tx.commit()?;
                tracing::info!(student = %id, "student updated");
                Ok(())
            }
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateIdentity {
                class_name: current.class_name,
                email,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove a student. Attendance history is kept (audit trail).
    pub fn remove(&self, id: StudentId) -> Result<(), StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM students WHERE id = ?1", params![id.0])?;
        if deleted == 0 {
            return Err(StoreError::NotFound { id });
        }
        tracing::info!(student = %id, "student removed");
        Ok(())
    }
}

fn decode_student_row(row: &Row<'_>) -> rusqlite::Result<StudentRecord> {
    let encoding = match row.get::<_, Option<Vec<u8>>>(6)? {
        Some(blob) => Some(decode_embedding(&blob).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Blob,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())),
            )
        })?),
        None => None,
    };

    Ok(StudentRecord {
        id: StudentId(row.get(0)?),
        class_name: row.get(1)?,
        name: row.get(2)?,
        age: row.get(3)?,
        email: row.get(4)?,
        image: row.get(5)?,
        encoding,
        created_at: row.get(7)?,
    })
}
