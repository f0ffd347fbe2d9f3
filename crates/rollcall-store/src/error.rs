use rollcall_core::StudentId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a student with email {email} already exists in class {class_name}")]
    DuplicateIdentity { class_name: String, email: String },
    #[error("student {id} not found")]
    NotFound { id: StudentId },
    #[error("corrupt face encoding blob: {0}")]
    CorruptEncoding(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// True when the error is a SQLite UNIQUE constraint violation, used to map
/// email collisions to [`StoreError::DuplicateIdentity`].
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
