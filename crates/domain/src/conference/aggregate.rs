//! Conference aggregate implementation.

use chrono::{Datelike, NaiveDate};
use common::{AggregateId, UserId};
use entity_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    ConferenceError, ConferenceEvent, ConferenceForm, ConferenceKey, events::ConferenceCreatedData,
};

/// Conference aggregate root.
///
/// Holds the descriptive fields set at creation and the seat counters the
/// booking engine moves. `seats_available` stays within
/// `0..=max_attendees`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conference {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    organizer: Option<UserId>,
    name: String,
    description: Option<String>,
    topics: Vec<String>,
    city: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    max_attendees: u32,
    seats_available: u32,
}

impl Aggregate for Conference {
    type Event = ConferenceEvent;
    type Error = ConferenceError;

    fn aggregate_type() -> &'static str {
        "Conference"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ConferenceEvent::ConferenceCreated(data) => self.apply_created(data),
            ConferenceEvent::SeatBooked(data) | ConferenceEvent::SeatReleased(data) => {
                self.seats_available = data.seats_available.min(self.max_attendees);
            }
        }
    }
}

// Query methods
impl Conference {
    /// Key callers use to name this conference.
    pub fn key(&self) -> Option<ConferenceKey> {
        self.id.map(ConferenceKey::from_record_id)
    }

    pub fn organizer(&self) -> Option<&UserId> {
        self.organizer.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Month of the start date (1-12), if one is set.
    pub fn month(&self) -> Option<u32> {
        self.start_date.map(|d| d.month())
    }

    /// Total seats, fixed at creation.
    pub fn max_attendees(&self) -> u32 {
        self.max_attendees
    }

    pub fn seats_available(&self) -> u32 {
        self.seats_available
    }

    pub fn seats_booked(&self) -> u32 {
        self.max_attendees.saturating_sub(self.seats_available)
    }

    pub fn is_sold_out(&self) -> bool {
        self.seats_available == 0
    }
}

// Command methods (return events)
impl Conference {
    /// Creates the conference with every seat available.
    pub fn create(
        &self,
        conference_id: AggregateId,
        organizer: UserId,
        form: &ConferenceForm,
    ) -> Result<Vec<ConferenceEvent>, ConferenceError> {
        if self.id.is_some() {
            return Err(ConferenceError::AlreadyCreated);
        }

        if form.name.trim().is_empty() {
            return Err(ConferenceError::NameRequired);
        }

        Ok(vec![ConferenceEvent::conference_created(
            conference_id,
            organizer,
            form,
        )])
    }

    /// Takes one seat.
    pub fn book_seat(&self) -> Result<Vec<ConferenceEvent>, ConferenceError> {
        let conference_id = self.id.ok_or(ConferenceError::NotCreated)?;

        if self.is_sold_out() {
            return Err(ConferenceError::SoldOut { conference_id });
        }

        Ok(vec![ConferenceEvent::seat_booked(self.seats_available - 1)])
    }

    /// Gives one seat back.
    pub fn release_seat(&self) -> Result<Vec<ConferenceEvent>, ConferenceError> {
        let conference_id = self.id.ok_or(ConferenceError::NotCreated)?;

        if self.seats_booked() == 0 {
            return Err(ConferenceError::NoSeatsBooked { conference_id });
        }

        Ok(vec![ConferenceEvent::seat_released(
            self.seats_available + 1,
        )])
    }
}

// Apply event helpers
impl Conference {
    fn apply_created(&mut self, data: ConferenceCreatedData) {
        self.id = Some(data.conference_id);
        self.organizer = Some(data.organizer);
        self.name = data.name;
        self.description = data.description;
        self.topics = data.topics;
        self.city = data.city;
        self.start_date = data.start_date;
        self.end_date = data.end_date;
        self.max_attendees = data.max_attendees;
        self.seats_available = data.max_attendees;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_conference(seats: u32) -> (Conference, AggregateId) {
        let mut conference = Conference::default();
        let id = AggregateId::new();
        let events = conference
            .create(
                id,
                UserId::new("organizer").unwrap(),
                &ConferenceForm::new("RustConf", seats),
            )
            .unwrap();
        conference.apply_events(events);
        (conference, id)
    }

    #[test]
    fn test_create_conference() {
        let (conference, id) = create_conference(3);
        assert_eq!(conference.id(), Some(id));
        assert_eq!(conference.key(), Some(ConferenceKey::from_record_id(id)));
        assert_eq!(conference.name(), "RustConf");
        assert_eq!(conference.organizer().map(UserId::as_str), Some("organizer"));
        assert_eq!(conference.max_attendees(), 3);
        assert_eq!(conference.seats_available(), 3);
        assert_eq!(conference.seats_booked(), 0);
    }

    #[test]
    fn test_create_twice_fails() {
        let (conference, _) = create_conference(3);
        let result = conference.create(
            AggregateId::new(),
            UserId::new("organizer").unwrap(),
            &ConferenceForm::new("Again", 1),
        );
        assert!(matches!(result, Err(ConferenceError::AlreadyCreated)));
    }

    #[test]
    fn test_create_requires_name() {
        let result = Conference::default().create(
            AggregateId::new(),
            UserId::new("organizer").unwrap(),
            &ConferenceForm::new("   ", 10),
        );
        assert!(matches!(result, Err(ConferenceError::NameRequired)));
    }

    #[test]
    fn test_month_from_start_date() {
        let mut conference = Conference::default();
        let form = ConferenceForm::new("RustConf", 10).with_dates(
            NaiveDate::from_ymd_opt(2026, 9, 10).unwrap(),
            NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
        );
        let events = conference
            .create(AggregateId::new(), UserId::new("o").unwrap(), &form)
            .unwrap();
        conference.apply_events(events);
        assert_eq!(conference.month(), Some(9));
    }

    #[test]
    fn test_book_until_sold_out() {
        let (mut conference, id) = create_conference(2);

        for expected in [1, 0] {
            let events = conference.book_seat().unwrap();
            conference.apply_events(events);
            assert_eq!(conference.seats_available(), expected);
        }

        assert!(conference.is_sold_out());
        assert!(matches!(
            conference.book_seat(),
            Err(ConferenceError::SoldOut { conference_id }) if conference_id == id
        ));
    }

    #[test]
    fn test_zero_capacity_is_sold_out() {
        let (conference, _) = create_conference(0);
        assert!(conference.is_sold_out());
        assert!(matches!(
            conference.book_seat(),
            Err(ConferenceError::SoldOut { .. })
        ));
    }

    #[test]
    fn test_release_restores_seat() {
        let (mut conference, _) = create_conference(1);
        let events = conference.book_seat().unwrap();
        conference.apply_events(events);
        assert_eq!(conference.seats_booked(), 1);
        let events = conference.release_seat().unwrap();
        conference.apply_events(events);
        assert_eq!(conference.seats_available(), 1);
        assert_eq!(conference.seats_booked(), 0);
    }

    #[test]
    fn test_release_never_exceeds_capacity() {
        let (conference, _) = create_conference(5);
        assert!(matches!(
            conference.release_seat(),
            Err(ConferenceError::NoSeatsBooked { .. })
        ));
    }

    #[test]
    fn test_seat_commands_require_creation() {
        let conference = Conference::default();
        assert!(matches!(
            conference.book_seat(),
            Err(ConferenceError::NotCreated)
        ));
        assert!(matches!(
            conference.release_seat(),
            Err(ConferenceError::NotCreated)
        ));
    }
}
