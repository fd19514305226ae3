use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a booking operation ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingReason {
    Ok,
    EventNotFound,
    AlreadyRegistered,
    SoldOut,
    NotRegistered,
    InternalError,
}

impl BookingReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingReason::Ok => "OK",
            BookingReason::EventNotFound => "EVENT_NOT_FOUND",
            BookingReason::AlreadyRegistered => "ALREADY_REGISTERED",
            BookingReason::SoldOut => "SOLD_OUT",
            BookingReason::NotRegistered => "NOT_REGISTERED",
            BookingReason::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for BookingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a register or unregister call.
///
/// `success` is true exactly when `reason` is [`BookingReason::Ok`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingOutcome {
    success: bool,
    reason: BookingReason,
}

impl BookingOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            reason: BookingReason::Ok,
        }
    }

    /// The outcome for `reason`; only [`BookingReason::Ok`] is a success.
    pub fn from_reason(reason: BookingReason) -> Self {
        Self {
            success: reason == BookingReason::Ok,
            reason,
        }
    }

    pub fn internal_error() -> Self {
        Self::from_reason(BookingReason::InternalError)
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn reason(&self) -> BookingReason {
        self.reason
    }

    /// Maps the outcome to what a caller reports, naming `conference_key`
    /// in not-found messages.
    pub fn into_result(self, conference_key: &str) -> Result<(), BookingRejection> {
        match self.reason {
            BookingReason::Ok => Ok(()),
            BookingReason::EventNotFound => {
                Err(BookingRejection::NotFound(conference_key.to_string()))
            }
            BookingReason::AlreadyRegistered => {
                Err(BookingRejection::Conflict("You have already registered"))
            }
            BookingReason::SoldOut => {
                Err(BookingRejection::Conflict("There are no seats available"))
            }
            BookingReason::NotRegistered => {
                Err(BookingRejection::Conflict("You have already unregistered"))
            }
            BookingReason::InternalError => Err(BookingRejection::Internal),
        }
    }
}

/// Caller-facing form of a failed outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingRejection {
    #[error("No Conference found with key: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("Unknown exception")]
    Internal,
}
