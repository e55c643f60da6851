//! Core persistence and lifecycle logic for the parcel tracker.
//! This crate is the single source of truth for the status gate.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::parcel::{
    created_at_now, format_created_at, ClientId, Parcel, ParcelNumber, ParcelStatus,
};
pub use repo::parcel_repo::{
    ParcelMutation, ParcelRepository, RepoError, RepoResult, SqliteParcelRepository,
};
pub use service::parcel_service::{ParcelService, ParcelServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
