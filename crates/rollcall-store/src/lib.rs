//! rollcall-store — Student roster and attendance ledger over SQLite.
//!
//! One fixed `students` table carrying a `class_name` column (never a table
//! per class) and one `attendance` table, written only by the ledger
//! operations in this crate.

pub mod db;
pub mod error;
pub mod ledger;
pub mod students;

pub use db::Database;
pub use error::StoreError;
pub use ledger::{AttendanceReport, RecordId};
pub use students::{NewStudent, StudentPatch};
