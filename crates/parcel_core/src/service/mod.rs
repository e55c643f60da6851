//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into parcel lifecycle use-cases.
//! - Keep CLI callers decoupled from storage details.

pub mod parcel_service;
