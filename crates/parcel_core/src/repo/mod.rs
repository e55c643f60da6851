//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract for parcel rows.
//! - Isolate SQLite statement details from service orchestration.
//!
//! # Invariants
//! - Every repository operation issues exactly one storage statement.
//! - Status-gated mutations carry the gate in the statement predicate.
//! - Repository APIs return semantic errors (`NotFound`, `NoRowsAffected`)
//!   in addition to DB transport errors.

pub mod parcel_repo;
