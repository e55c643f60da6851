//! SQLite storage bootstrap.
//!
//! # Responsibility
//! - Open and configure SQLite connections holding the `parcel` table.
//! - Create the table on first use.
//!
//! # Invariants
//! - Schema setup is idempotent (`CREATE ... IF NOT EXISTS`); existing rows
//!   are never touched and no schema versioning is performed.
//! - The caller owns the returned connection and decides when to close it.

mod open;

pub use open::{open_db, open_db_in_memory};
pub use rusqlite::Connection;

pub type DbResult<T> = Result<T, DbError>;

/// Storage-level failure surfaced by the SQLite engine.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}
