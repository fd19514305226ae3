//! Profile record: one per user, holding the conferences they attend.

mod aggregate;
mod events;
mod form;
mod service;

pub use aggregate::{Profile, default_display_name};
pub use events::{AttendanceData, ProfileCreatedData, ProfileEvent, ProfileUpdatedData};
pub use form::{ProfileForm, TeeShirtSize};
pub use service::ProfileService;

use common::{AggregateId, UserId};
use thiserror::Error;
use uuid::Uuid;

use crate::conference::ConferenceKey;

/// Namespace for name-based profile identities.
const PROFILE_NAMESPACE: Uuid = Uuid::from_u128(0x6c0f_3a52_9d1e_4b7a_8f26_51c4_e0b9_7d13);

/// Identity of the profile record owned by `user_id`.
///
/// Deterministic: the same user always maps to the same record, so two
/// concurrent first registrations race on one record instead of creating two.
pub fn profile_id(user_id: &UserId) -> AggregateId {
    AggregateId::from_name(&PROFILE_NAMESPACE, user_id.as_str())
}

/// Errors that can occur during profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile already created")]
    AlreadyCreated,

    #[error("Profile has not been created")]
    NotCreated,

    #[error("Already attending conference {conference_key}")]
    AlreadyAttending { conference_key: ConferenceKey },

    #[error("Not attending conference {conference_key}")]
    NotAttending { conference_key: ConferenceKey },
}
