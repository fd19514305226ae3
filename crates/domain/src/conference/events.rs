//! Conference changes.

use chrono::{DateTime, NaiveDate, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::ConferenceForm;

/// Changes that can happen to a conference record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ConferenceEvent {
    ConferenceCreated(ConferenceCreatedData),

    /// One seat was taken.
    SeatBooked(SeatChangeData),

    /// One seat was given back.
    SeatReleased(SeatChangeData),
}

impl DomainEvent for ConferenceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ConferenceEvent::ConferenceCreated(_) => "ConferenceCreated",
            ConferenceEvent::SeatBooked(_) => "SeatBooked",
            ConferenceEvent::SeatReleased(_) => "SeatReleased",
        }
    }
}

/// Data for ConferenceCreated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConferenceCreatedData {
    pub conference_id: AggregateId,

    /// User who created the conference.
    pub organizer: UserId,

    pub name: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub city: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    /// Total seats. Every seat starts out available.
    pub max_attendees: u32,

    pub created_at: DateTime<Utc>,
}

/// Data for SeatBooked and SeatReleased events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatChangeData {
    /// Seats left once the change is applied.
    pub seats_available: u32,

    pub changed_at: DateTime<Utc>,
}

impl ConferenceEvent {
    pub fn conference_created(
        conference_id: AggregateId,
        organizer: UserId,
        form: &ConferenceForm,
    ) -> Self {
        ConferenceEvent::ConferenceCreated(ConferenceCreatedData {
            conference_id,
            organizer,
            name: form.name.trim().to_string(),
            description: form.description.clone(),
            topics: form.topics.clone(),
            city: form.city.clone(),
            start_date: form.start_date,
            end_date: form.end_date,
            max_attendees: form.max_attendees,
            created_at: Utc::now(),
        })
    }

    pub fn seat_booked(seats_available: u32) -> Self {
        ConferenceEvent::SeatBooked(SeatChangeData {
            seats_available,
            changed_at: Utc::now(),
        })
    }

    pub fn seat_released(seats_available: u32) -> Self {
        ConferenceEvent::SeatReleased(SeatChangeData {
            seats_available,
            changed_at: Utc::now(),
        })
    }
}
