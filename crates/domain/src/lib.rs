//! Domain layer for conference seat booking.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits for records rebuilt from their changes
//! - Transactions that read and write several records atomically, with retry
//! - Conference and Profile records
//! - The booking engine that registers and unregisters users for conferences

pub mod aggregate;
pub mod booking;
pub mod conference;
pub mod config;
pub mod error;
pub mod identity;
pub mod profile;
pub mod repository;
pub mod transaction;

pub use aggregate::{Aggregate, DomainEvent};
pub use booking::{
    BookingEngine, BookingOutcome, BookingReason, BookingRejection, SeatAudit, SeatViolation,
    audit_seat_consistency,
};
pub use conference::{
    Conference, ConferenceError, ConferenceEvent, ConferenceForm, ConferenceKey, ConferenceService,
};
pub use config::BookingConfig;
pub use error::DomainError;
pub use identity::{Identity, IdentityProvider, InMemoryIdentityProvider};
pub use profile::{
    Profile, ProfileError, ProfileEvent, ProfileForm, ProfileService, TeeShirtSize, profile_id,
};
pub use repository::Repository;
pub use transaction::{Transaction, TransactionRunner, TransactionalWork};
