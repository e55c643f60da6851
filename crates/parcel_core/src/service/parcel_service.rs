//! Parcel lifecycle use-case service.
//!
//! # Responsibility
//! - Register parcels with a creation timestamp.
//! - Move parcels along `registered -> sent -> delivered`.
//! - Translate repository gate rejections into use-case errors.
//!
//! # Invariants
//! - The status gate is never re-checked here; the repository statement is
//!   the only authority on whether an address change or delete applies.
//! - `advance_status` reads then writes, so it is not atomic with respect to
//!   concurrent status writers.

use crate::model::parcel::{created_at_now, ClientId, Parcel, ParcelNumber, ParcelStatus};
use crate::repo::parcel_repo::{ParcelRepository, RepoError};
use log::info;

/// Service error for parcel use-cases.
#[derive(Debug, thiserror::Error)]
pub enum ParcelServiceError {
    /// Target parcel does not exist.
    #[error("parcel not found: {0}")]
    NotFound(ParcelNumber),
    /// Address can only change while the parcel is `registered`.
    #[error("address of parcel {0} can no longer be changed")]
    AddressLocked(ParcelNumber),
    /// Only `registered` parcels can be cancelled.
    #[error("parcel {0} can no longer be cancelled")]
    NotCancellable(ParcelNumber),
    #[error("parcel {0} is already delivered")]
    AlreadyDelivered(ParcelNumber),
    /// Stored status is not part of the known lifecycle.
    #[error("parcel {number} has unknown status `{status}`")]
    UnknownStatus {
        number: ParcelNumber,
        status: String,
    },
    /// Persistence-layer failure.
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for ParcelServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(number) => Self::NotFound(number),
            other => Self::Repo(other),
        }
    }
}

/// Parcel service facade over repository implementations.
pub struct ParcelService<R: ParcelRepository> {
    repo: R,
}

impl<R: ParcelRepository> ParcelService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new parcel stamped with the current UTC time.
    ///
    /// Returns the stored row as read back from the repository.
    pub fn register(
        &self,
        client: ClientId,
        address: impl Into<String>,
    ) -> Result<Parcel, ParcelServiceError> {
        let parcel = Parcel::registered(client, address, created_at_now());
        let number = self.repo.add(&parcel)?;
        info!("event=parcel_register module=service status=ok number={number} client={client}");
        Ok(self.repo.get(number)?)
    }

    /// Gets one parcel by number.
    pub fn parcel(&self, number: ParcelNumber) -> Result<Parcel, ParcelServiceError> {
        Ok(self.repo.get(number)?)
    }

    /// Lists every parcel owned by `client`.
    pub fn client_parcels(&self, client: ClientId) -> Result<Vec<Parcel>, ParcelServiceError> {
        Ok(self.repo.get_by_client(client)?)
    }

    /// Moves a parcel one step along its lifecycle and returns the new state.
    pub fn advance_status(
        &self,
        number: ParcelNumber,
    ) -> Result<ParcelStatus, ParcelServiceError> {
        let parcel = self.repo.get(number)?;
        let current = parcel
            .lifecycle_status()
            .ok_or_else(|| ParcelServiceError::UnknownStatus {
                number,
                status: parcel.status.clone(),
            })?;
        let next = current
            .next()
            .ok_or(ParcelServiceError::AlreadyDelivered(number))?;

        self.repo
            .set_status(number, next.as_str())
            .map_err(|err| match err {
                RepoError::NoRowsAffected { .. } => ParcelServiceError::NotFound(number),
                other => other.into(),
            })?;
        info!(
            "event=parcel_advance module=service status=ok number={number} from={current} to={next}"
        );
        Ok(next)
    }

    /// Changes the delivery address of a `registered` parcel.
    pub fn change_address(
        &self,
        number: ParcelNumber,
        address: &str,
    ) -> Result<(), ParcelServiceError> {
        self.repo.set_address(number, address).map_err(|err| {
            self.classify_rejection(err, number, ParcelServiceError::AddressLocked)
        })
    }

    /// Deletes a `registered` parcel.
    pub fn cancel(&self, number: ParcelNumber) -> Result<(), ParcelServiceError> {
        self.repo.delete(number).map_err(|err| {
            self.classify_rejection(err, number, ParcelServiceError::NotCancellable)
        })?;
        info!("event=parcel_cancel module=service status=ok number={number}");
        Ok(())
    }

    /// Splits a zero-row mutation into "absent" and "gate rejected".
    ///
    /// The follow-up read only labels the error; the mutation already ran
    /// under the statement-level gate.
    fn classify_rejection(
        &self,
        err: RepoError,
        number: ParcelNumber,
        gate_error: fn(ParcelNumber) -> ParcelServiceError,
    ) -> ParcelServiceError {
        if !err.is_no_rows_affected() {
            return err.into();
        }
        match self.repo.get(number) {
            Ok(_) => gate_error(number),
            Err(lookup) => lookup.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ParcelService, ParcelServiceError};
    use crate::model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus};
    use crate::repo::parcel_repo::{ParcelMutation, ParcelRepository, RepoError, RepoResult};
    use std::cell::RefCell;

    /// In-memory stand-in that applies the same gate rules as SQLite.
    #[derive(Default)]
    struct MemoryRepo {
        rows: RefCell<Vec<Parcel>>,
    }

    impl ParcelRepository for MemoryRepo {
        fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber> {
            let mut rows = self.rows.borrow_mut();
            let number = rows.len() as ParcelNumber + 1;
            let mut stored = parcel.clone();
            stored.number = number;
            rows.push(stored);
            Ok(number)
        }

        fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
            self.rows
                .borrow()
                .iter()
                .find(|row| row.number == number)
                .cloned()
                .ok_or(RepoError::NotFound(number))
        }

        fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
            Ok(self
                .rows
                .borrow()
                .iter()
                .filter(|row| row.client == client)
                .cloned()
                .collect())
        }

        fn set_status(&self, number: ParcelNumber, status: &str) -> RepoResult<()> {
            let mut rows = self.rows.borrow_mut();
            let row = rows.iter_mut().find(|row| row.number == number).ok_or(
                RepoError::NoRowsAffected {
                    operation: ParcelMutation::SetStatus,
                    number,
                },
            )?;
            row.status = status.to_string();
            Ok(())
        }

        fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
            let mut rows = self.rows.borrow_mut();
            let row = rows
                .iter_mut()
                .find(|row| row.number == number && row.status == "registered")
                .ok_or(RepoError::NoRowsAffected {
                    operation: ParcelMutation::SetAddress,
                    number,
                })?;
            row.address = address.to_string();
            Ok(())
        }

        fn delete(&self, number: ParcelNumber) -> RepoResult<()> {
            let mut rows = self.rows.borrow_mut();
            let before = rows.len();
            rows.retain(|row| !(row.number == number && row.status == "registered"));
            if rows.len() == before {
                return Err(RepoError::NoRowsAffected {
                    operation: ParcelMutation::Delete,
                    number,
                });
            }
            Ok(())
        }
    }

    #[test]
    fn register_stamps_registered_status_and_timestamp() {
        let service = ParcelService::new(MemoryRepo::default());
        let parcel = service.register(42, "Main st. 1").unwrap();

        assert_eq!(parcel.number, 1);
        assert_eq!(parcel.client, 42);
        assert_eq!(parcel.lifecycle_status(), Some(ParcelStatus::Registered));
        assert!(parcel.created_at.ends_with('Z'));
    }

    #[test]
    fn advance_walks_lifecycle_then_stops() {
        let service = ParcelService::new(MemoryRepo::default());
        let number = service.register(1, "a").unwrap().number;

        assert_eq!(service.advance_status(number).unwrap(), ParcelStatus::Sent);
        assert_eq!(
            service.advance_status(number).unwrap(),
            ParcelStatus::Delivered
        );
        let err = service.advance_status(number).unwrap_err();
        assert!(matches!(err, ParcelServiceError::AlreadyDelivered(n) if n == number));
    }

    #[test]
    fn advance_rejects_unknown_status() {
        let repo = MemoryRepo::default();
        let number = repo
            .add(&Parcel::new(1, "lost", "a", "2024-01-01T00:00:00Z"))
            .unwrap();
        let service = ParcelService::new(repo);

        let err = service.advance_status(number).unwrap_err();
        assert!(matches!(
            err,
            ParcelServiceError::UnknownStatus { status, .. } if status == "lost"
        ));
    }

    #[test]
    fn gate_rejections_map_to_use_case_errors() {
        let service = ParcelService::new(MemoryRepo::default());
        let number = service.register(1, "a").unwrap().number;
        service.advance_status(number).unwrap();

        assert!(matches!(
            service.change_address(number, "b").unwrap_err(),
            ParcelServiceError::AddressLocked(n) if n == number
        ));
        assert!(matches!(
            service.cancel(number).unwrap_err(),
            ParcelServiceError::NotCancellable(n) if n == number
        ));
        assert_eq!(service.parcel(number).unwrap().address, "a");
    }

    #[test]
    fn missing_parcel_maps_to_not_found() {
        let service = ParcelService::new(MemoryRepo::default());
        assert!(matches!(
            service.parcel(9).unwrap_err(),
            ParcelServiceError::NotFound(9)
        ));
        assert!(matches!(
            service.advance_status(9).unwrap_err(),
            ParcelServiceError::NotFound(9)
        ));
        assert!(matches!(
            service.change_address(9, "x").unwrap_err(),
            ParcelServiceError::NotFound(9)
        ));
        assert!(matches!(
            service.cancel(9).unwrap_err(),
            ParcelServiceError::NotFound(9)
        ));
    }

    #[test]
    fn cancelled_parcel_is_not_found_afterwards() {
        let service = ParcelService::new(MemoryRepo::default());
        let number = service.register(1, "a").unwrap().number;
        service.cancel(number).unwrap();

        assert!(matches!(
            service.cancel(number).unwrap_err(),
            ParcelServiceError::NotFound(n) if n == number
        ));
    }
}
