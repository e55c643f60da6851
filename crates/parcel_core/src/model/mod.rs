//! Parcel domain model.
//!
//! # Responsibility
//! - Define the parcel record mirrored by the `parcel` table.
//! - Describe the conventional `registered -> sent -> delivered` lifecycle.
//!
//! # Invariants
//! - `Parcel::number` is assigned by storage and never changes afterwards.
//! - Lifecycle ordering is descriptive only; storage accepts any status text.

pub mod parcel;
