//! Profile aggregate implementation.

use common::{AggregateId, UserId};
use entity_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::conference::ConferenceKey;

use super::{ProfileError, ProfileEvent, ProfileForm, TeeShirtSize, events::ProfileCreatedData};

/// Display name used when the caller supplies none: the part of the email
/// before `@`, or the whole email when it has no `@`.
pub fn default_display_name(main_email: &str) -> String {
    match main_email.split_once('@') {
        Some((local, _)) => local.to_string(),
        None => main_email.to_string(),
    }
}

/// Profile aggregate root.
///
/// `conference_keys_to_attend` never holds a key twice and keeps
/// registration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    user_id: Option<UserId>,
    display_name: String,
    main_email: String,
    tee_shirt_size: TeeShirtSize,
    conference_keys_to_attend: Vec<ConferenceKey>,
}

impl Aggregate for Profile {
    type Event = ProfileEvent;
    type Error = ProfileError;

    fn aggregate_type() -> &'static str {
        "Profile"
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
            ProfileEvent::ProfileCreated(data) => self.apply_created(data),
            ProfileEvent::ProfileUpdated(data) => {
                if let Some(display_name) = data.display_name {
                    self.display_name = display_name;
                }
                if let Some(size) = data.tee_shirt_size {
                    self.tee_shirt_size = size;
                }
            }
            ProfileEvent::AttendanceAdded(data) => {
                if !self.attends(data.conference_key) {
                    self.conference_keys_to_attend.push(data.conference_key);
                }
            }
            ProfileEvent::AttendanceRemoved(data) => {
                self.conference_keys_to_attend
                    .retain(|k| *k != data.conference_key);
            }
        }
    }
}

// Query methods
impl Profile {
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn main_email(&self) -> &str {
        &self.main_email
    }

    pub fn tee_shirt_size(&self) -> TeeShirtSize {
        self.tee_shirt_size
    }

    /// Conferences this user is registered for, in registration order.
    pub fn conference_keys_to_attend(&self) -> &[ConferenceKey] {
        &self.conference_keys_to_attend
    }

    pub fn attends(&self, conference_key: ConferenceKey) -> bool {
        self.conference_keys_to_attend.contains(&conference_key)
    }
}

// Command methods (return events)
impl Profile {
    /// Creates the profile. Missing form fields fall back to defaults.
    pub fn create(
        &self,
        profile_id: AggregateId,
        user_id: UserId,
        main_email: &str,
        form: &ProfileForm,
    ) -> Result<Vec<ProfileEvent>, ProfileError> {
        if self.id.is_some() {
            return Err(ProfileError::AlreadyCreated);
        }

        let display_name = form
            .display_name
            .clone()
            .unwrap_or_else(|| default_display_name(main_email));

        Ok(vec![ProfileEvent::profile_created(
            profile_id,
            user_id,
            display_name,
            main_email.to_string(),
            form.tee_shirt_size.unwrap_or_default(),
        )])
    }

    /// Applies the fields the form sets. Returns no events when nothing changes.
    pub fn update(&self, form: &ProfileForm) -> Result<Vec<ProfileEvent>, ProfileError> {
        if self.id.is_none() {
            return Err(ProfileError::NotCreated);
        }

        let display_name = form
            .display_name
            .clone()
            .filter(|name| *name != self.display_name);
        let tee_shirt_size = form
            .tee_shirt_size
            .filter(|size| *size != self.tee_shirt_size);

        if display_name.is_none() && tee_shirt_size.is_none() {
            return Ok(vec![]);
        }

        Ok(vec![ProfileEvent::profile_updated(
            display_name,
            tee_shirt_size,
        )])
    }

    /// Adds a conference to the registration list.
    ///
    /// Only checks for duplicates, so it can be staged together with the
    /// profile's creation.
    pub fn add_attendance(
        &self,
        conference_key: ConferenceKey,
    ) -> Result<Vec<ProfileEvent>, ProfileError> {
        if self.attends(conference_key) {
            return Err(ProfileError::AlreadyAttending { conference_key });
        }

        Ok(vec![ProfileEvent::attendance_added(conference_key)])
    }

    pub fn remove_attendance(
        &self,
        conference_key: ConferenceKey,
    ) -> Result<Vec<ProfileEvent>, ProfileError> {
        if !self.attends(conference_key) {
            return Err(ProfileError::NotAttending { conference_key });
        }

        Ok(vec![ProfileEvent::attendance_removed(conference_key)])
    }
}

// Apply event helpers
impl Profile {
    fn apply_created(&mut self, data: ProfileCreatedData) {
        self.id = Some(data.profile_id);
        self.user_id = Some(data.user_id);
        self.display_name = data.display_name;
        self.main_email = data.main_email;
        self.tee_shirt_size = data.tee_shirt_size;
    }
}
