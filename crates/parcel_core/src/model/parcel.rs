//! Parcel record and lifecycle status.
//!
//! # Responsibility
//! - Hold the five persisted parcel fields.
//! - Map lifecycle states to their stored text form.
//!
//! # Invariants
//! - `status` is kept as raw text so non-canonical values survive a
//!   round-trip through storage unchanged.
//! - `created_at` is an RFC 3339 UTC timestamp when produced by this crate.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Storage-assigned parcel identifier (`parcel.number`).
pub type ParcelNumber = i64;

/// Owning client identifier (`parcel.client`).
pub type ClientId = i64;

/// Conventional lifecycle states of a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    /// Accepted but not yet handed to a carrier. The only mutable state.
    Registered,
    /// Handed to a carrier.
    Sent,
    /// Received by the client.
    Delivered,
}

impl ParcelStatus {
    /// Stored text form of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
        }
    }

    /// Parses a stored status value. Unknown text yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "registered" => Some(Self::Registered),
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }

    /// Next state along the conventional lifecycle, `None` once delivered.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Registered => Some(Self::Sent),
            Self::Sent => Some(Self::Delivered),
            Self::Delivered => None,
        }
    }
}

impl Display for ParcelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the `parcel` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Assigned by storage on insert. `0` for a value not yet persisted.
    pub number: ParcelNumber,
    pub client: ClientId,
    /// Raw status text, usually one of [`ParcelStatus::as_str`].
    pub status: String,
    pub address: String,
    pub created_at: String,
}

impl Parcel {
    /// Builds a parcel that has not been persisted yet.
    pub fn new(
        client: ClientId,
        status: impl Into<String>,
        address: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            number: 0,
            client,
            status: status.into(),
            address: address.into(),
            created_at: created_at.into(),
        }
    }

    /// Builds a not-yet-persisted parcel in the `registered` state.
    pub fn registered(
        client: ClientId,
        address: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self::new(
            client,
            ParcelStatus::Registered.as_str(),
            address,
            created_at,
        )
    }

    /// Lifecycle state of this parcel, `None` for non-canonical status text.
    pub fn lifecycle_status(&self) -> Option<ParcelStatus> {
        ParcelStatus::parse(&self.status)
    }
}

/// Creation timestamp for a parcel registered right now.
pub fn created_at_now() -> String {
    format_created_at(Utc::now())
}

/// Formats a creation timestamp as RFC 3339 with second precision (`...Z`).
pub fn format_created_at(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::{format_created_at, Parcel, ParcelStatus};
    use chrono::{TimeZone, Utc};

    #[test]
    fn status_text_roundtrips_for_known_values() {
        for status in [
            ParcelStatus::Registered,
            ParcelStatus::Sent,
            ParcelStatus::Delivered,
        ] {
            assert_eq!(ParcelStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ParcelStatus::parse("Registered"), None);
        assert_eq!(ParcelStatus::parse("lost"), None);
    }

    #[test]
    fn lifecycle_ends_at_delivered() {
        assert_eq!(ParcelStatus::Registered.next(), Some(ParcelStatus::Sent));
        assert_eq!(ParcelStatus::Sent.next(), Some(ParcelStatus::Delivered));
        assert_eq!(ParcelStatus::Delivered.next(), None);
    }

    #[test]
    fn registered_constructor_leaves_number_unassigned() {
        let parcel = Parcel::registered(1000, "test", "2024-01-01T00:00:00Z");
        assert_eq!(parcel.number, 0);
        assert_eq!(parcel.status, "registered");
        assert_eq!(parcel.lifecycle_status(), Some(ParcelStatus::Registered));
    }

    #[test]
    fn non_canonical_status_has_no_lifecycle_state() {
        let parcel = Parcel::new(1, "lost in transit", "x", "2024-01-01T00:00:00Z");
        assert_eq!(parcel.lifecycle_status(), None);
    }

    #[test]
    fn created_at_uses_second_precision_utc() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_created_at(at), "2024-03-09T07:05:01Z");
    }

    #[test]
    fn json_uses_column_names() {
        let mut parcel = Parcel::registered(5, "Main st.", "2024-01-01T00:00:00Z");
        parcel.number = 12;
        let value = serde_json::to_value(&parcel).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "number": 12,
                "client": 5,
                "status": "registered",
                "address": "Main st.",
                "created_at": "2024-01-01T00:00:00Z",
            })
        );
    }
}
