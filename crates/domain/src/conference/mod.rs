//! Conference record: identity, descriptive fields, and seat capacity.

mod aggregate;
mod events;
mod form;
mod key;
mod service;

pub use aggregate::Conference;
pub use events::{ConferenceCreatedData, ConferenceEvent, SeatChangeData};
pub use form::ConferenceForm;
pub use key::ConferenceKey;
pub use service::ConferenceService;

use common::AggregateId;
use thiserror::Error;

/// Errors that can occur during conference operations.
#[derive(Debug, Error)]
pub enum ConferenceError {
    #[error("Conference already created")]
    AlreadyCreated,

    #[error("Conference name is required")]
    NameRequired,

    #[error("Conference has not been created")]
    NotCreated,

    /// Every seat is taken.
    #[error("Conference {conference_id} is sold out")]
    SoldOut { conference_id: AggregateId },

    /// Releasing would push availability above capacity.
    #[error("Conference {conference_id} has no booked seats to release")]
    NoSeatsBooked { conference_id: AggregateId },
}
