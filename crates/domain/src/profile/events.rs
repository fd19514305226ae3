//! Profile changes.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::conference::ConferenceKey;

use super::TeeShirtSize;

/// Changes that can happen to a profile record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProfileEvent {
    ProfileCreated(ProfileCreatedData),

    /// Display name or tee-shirt size changed.
    ProfileUpdated(ProfileUpdatedData),

    /// A conference was added to the registration list.
    AttendanceAdded(AttendanceData),

    /// A conference was removed from the registration list.
    AttendanceRemoved(AttendanceData),
}

impl DomainEvent for ProfileEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProfileEvent::ProfileCreated(_) => "ProfileCreated",
            ProfileEvent::ProfileUpdated(_) => "ProfileUpdated",
            ProfileEvent::AttendanceAdded(_) => "AttendanceAdded",
            ProfileEvent::AttendanceRemoved(_) => "AttendanceRemoved",
        }
    }
}

/// Data for ProfileCreated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileCreatedData {
    pub profile_id: AggregateId,
    pub user_id: UserId,
    pub display_name: String,
    pub main_email: String,
    pub tee_shirt_size: TeeShirtSize,
    pub created_at: DateTime<Utc>,
}

/// Data for ProfileUpdated event. Only the fields that changed are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdatedData {
    pub display_name: Option<String>,
    pub tee_shirt_size: Option<TeeShirtSize>,
}

/// Data for AttendanceAdded and AttendanceRemoved events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceData {
    pub conference_key: ConferenceKey,
    pub changed_at: DateTime<Utc>,
}

impl ProfileEvent {
    pub fn profile_created(
        profile_id: AggregateId,
        user_id: UserId,
        display_name: String,
        main_email: String,
        tee_shirt_size: TeeShirtSize,
    ) -> Self {
        ProfileEvent::ProfileCreated(ProfileCreatedData {
            profile_id,
            user_id,
            display_name,
            main_email,
            tee_shirt_size,
            created_at: Utc::now(),
        })
    }

    pub fn profile_updated(
        display_name: Option<String>,
        tee_shirt_size: Option<TeeShirtSize>,
    ) -> Self {
        ProfileEvent::ProfileUpdated(ProfileUpdatedData {
            display_name,
            tee_shirt_size,
        })
    }

    pub fn attendance_added(conference_key: ConferenceKey) -> Self {
        ProfileEvent::AttendanceAdded(AttendanceData {
            conference_key,
            changed_at: Utc::now(),
        })
    }

    pub fn attendance_removed(conference_key: ConferenceKey) -> Self {
        ProfileEvent::AttendanceRemoved(AttendanceData {
            conference_key,
            changed_at: Utc::now(),
        })
    }
}
