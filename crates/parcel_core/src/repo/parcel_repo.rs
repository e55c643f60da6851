//! Parcel repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Map `Parcel` values to and from rows of the `parcel` table.
//! - Enforce the status gate for address changes and deletion.
//!
//! # Invariants
//! - Address updates and deletes match only rows whose persisted status is
//!   `registered`, checked inside the same `UPDATE`/`DELETE` statement.
//! - All values are bound as named parameters.
//! - A mutation that affects zero rows is reported as `NoRowsAffected`.
//! - The repository borrows its connection and never opens or closes it.

use crate::db::DbError;
use crate::model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus};
use log::debug;
use rusqlite::{named_params, Connection, OptionalExtension, Row};
use std::fmt::{Display, Formatter};

const PARCEL_TABLE: &str = "parcel";
const PARCEL_COLUMNS: [&str; 5] = ["number", "client", "status", "address", "created_at"];

const PARCEL_SELECT_SQL: &str = "SELECT
    number,
    client,
    status,
    address,
    created_at
FROM parcel";

pub type RepoResult<T> = Result<T, RepoError>;

/// Mutating repository operation, used to label `NoRowsAffected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParcelMutation {
    SetStatus,
    SetAddress,
    Delete,
}

impl ParcelMutation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SetStatus => "set_status",
            Self::SetAddress => "set_address",
            Self::Delete => "delete",
        }
    }
}

impl Display for ParcelMutation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository error for parcel persistence and query operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Storage failure, propagated unchanged.
    #[error(transparent)]
    Db(#[from] DbError),
    /// `get` matched no row.
    #[error("parcel not found: {0}")]
    NotFound(ParcelNumber),
    /// The parcel is absent or the status gate rejected the mutation.
    #[error("no rows modified by {operation} for parcel {number}")]
    NoRowsAffected {
        operation: ParcelMutation,
        number: ParcelNumber,
    },
    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),
    #[error("required column `{table}.{column}` is missing")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_no_rows_affected(&self) -> bool {
        matches!(self, Self::NoRowsAffected { .. })
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for parcel operations.
pub trait ParcelRepository {
    /// Inserts a new row and returns the storage-assigned number.
    ///
    /// `parcel.number` is ignored.
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber>;
    /// Reads one parcel. Missing rows yield `RepoError::NotFound`.
    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel>;
    /// Reads every parcel owned by `client` in storage order.
    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>>;
    /// Overwrites the status text without any lifecycle check.
    fn set_status(&self, number: ParcelNumber, status: &str) -> RepoResult<()>;
    /// Overwrites the address while the parcel is still `registered`.
    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()>;
    /// Deletes the parcel while it is still `registered`.
    fn delete(&self, number: ParcelNumber) -> RepoResult<()>;
}

/// SQLite-backed parcel repository.
pub struct SqliteParcelRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParcelRepository<'conn> {
    /// Constructs a repository from a bootstrapped connection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the `parcel`
    ///   table does not have the expected shape.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_parcel_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn check_changed(
        changed: usize,
        operation: ParcelMutation,
        number: ParcelNumber,
    ) -> RepoResult<()> {
        if changed == 0 {
            debug!(
                "event=parcel_mutation module=repo status=rejected operation={operation} number={number}"
            );
            return Err(RepoError::NoRowsAffected { operation, number });
        }
        Ok(())
    }
}

impl ParcelRepository for SqliteParcelRepository<'_> {
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber> {
        let number = self.conn.query_row(
            "INSERT INTO parcel (client, status, address, created_at)
             VALUES (:client, :status, :address, :created_at)
             RETURNING number;",
            named_params! {
                ":client": parcel.client,
                ":status": parcel.status.as_str(),
                ":address": parcel.address.as_str(),
                ":created_at": parcel.created_at.as_str(),
            },
            |row| row.get::<_, ParcelNumber>(0),
        )?;

        Ok(number)
    }

    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        self.conn
            .query_row(
                &format!("{PARCEL_SELECT_SQL} WHERE number = :number;"),
                named_params! { ":number": number },
                parse_parcel_row,
            )
            .optional()?
            .ok_or(RepoError::NotFound(number))
    }

    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PARCEL_SELECT_SQL} WHERE client = :client;"))?;
        let mut rows = stmt.query(named_params! { ":client": client })?;
        let mut parcels = Vec::new();

        while let Some(row) = rows.next()? {
            parcels.push(parse_parcel_row(row)?);
        }

        Ok(parcels)
    }

    fn set_status(&self, number: ParcelNumber, status: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE parcel SET status = :status WHERE number = :number;",
            named_params! {
                ":status": status,
                ":number": number,
            },
        )?;

        Self::check_changed(changed, ParcelMutation::SetStatus, number)
    }

    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE parcel
             SET address = :address
             WHERE number = :number
               AND status = :status;",
            named_params! {
                ":address": address,
                ":number": number,
                ":status": ParcelStatus::Registered.as_str(),
            },
        )?;

        Self::check_changed(changed, ParcelMutation::SetAddress, number)
    }

    fn delete(&self, number: ParcelNumber) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM parcel
             WHERE number = :number
               AND status = :status;",
            named_params! {
                ":number": number,
                ":status": ParcelStatus::Registered.as_str(),
            },
        )?;

        Self::check_changed(changed, ParcelMutation::Delete, number)
    }
}

fn parse_parcel_row(row: &Row<'_>) -> rusqlite::Result<Parcel> {
    Ok(Parcel {
        number: row.get("number")?,
        client: row.get("client")?,
        status: row.get("status")?,
        address: row.get("address")?,
        created_at: row.get("created_at")?,
    })
}

fn ensure_parcel_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, PARCEL_TABLE)? {
        return Err(RepoError::MissingRequiredTable(PARCEL_TABLE));
    }

    for column in PARCEL_COLUMNS {
        if !table_has_column(conn, PARCEL_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: PARCEL_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{ParcelRepository, RepoError, SqliteParcelRepository};
    use rusqlite::Connection;

    #[test]
    fn try_new_rejects_connection_without_parcel_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteParcelRepository::try_new(&conn)
            .err()
            .expect("missing table must be rejected");
        assert!(matches!(err, RepoError::MissingRequiredTable("parcel")));
    }

    #[test]
    fn try_new_rejects_table_missing_a_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE parcel (
                number INTEGER PRIMARY KEY,
                client INTEGER,
                status TEXT,
                address TEXT
            );",
        )
        .unwrap();

        let err = SqliteParcelRepository::try_new(&conn)
            .err()
            .expect("missing column must be rejected");
        assert!(matches!(
            err,
            RepoError::MissingRequiredColumn {
                table: "parcel",
                column: "created_at"
            }
        ));
    }

    #[test]
    fn storage_failures_are_not_classified_as_semantic_errors() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE parcel (
                number INTEGER PRIMARY KEY,
                client INTEGER,
                status TEXT,
                address TEXT,
                created_at TEXT
            );
            CREATE TRIGGER parcel_reject_update BEFORE UPDATE ON parcel
            BEGIN
                SELECT RAISE(ABORT, 'updates disabled');
            END;
            INSERT INTO parcel VALUES (1, 7, 'registered', 'a', '2024-01-01T00:00:00Z');",
        )
        .unwrap();
        let repo = SqliteParcelRepository::try_new(&conn).unwrap();

        let err = repo.set_address(1, "b").unwrap_err();
        assert!(matches!(err, RepoError::Db(_)));
        assert!(!err.is_no_rows_affected());
        assert!(!err.is_not_found());
    }
}
