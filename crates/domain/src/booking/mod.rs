//! Seat booking: atomic register and unregister over a conference and a profile.

mod audit;
mod engine;
mod outcome;

pub use audit::{SeatAudit, SeatViolation, audit_seat_consistency};
pub use engine::BookingEngine;
pub use outcome::{BookingOutcome, BookingReason, BookingRejection};
