//! Conference service providing creation and lookups.

use async_trait::async_trait;
use common::AggregateId;
use entity_store::EntityStore;

use crate::aggregate::Aggregate;
use crate::config::BookingConfig;
use crate::error::DomainError;
use crate::identity::Identity;
use crate::profile::{Profile, ProfileForm, profile_id};
use crate::repository::Repository;
use crate::transaction::{Transaction, TransactionRunner, TransactionalWork};

use super::{Conference, ConferenceForm, ConferenceKey};

/// Service for creating and reading conferences.
#[derive(Clone)]
pub struct ConferenceService<S> {
    runner: TransactionRunner<S>,
    repository: Repository<S>,
}

impl<S: EntityStore + Clone> ConferenceService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, BookingConfig::default())
    }

    pub fn with_config(store: S, config: BookingConfig) -> Self {
        Self {
            runner: TransactionRunner::with_config(store.clone(), config),
            repository: Repository::new(store),
        }
    }

    /// Creates a conference organized by the caller, with every seat available.
    ///
    /// The organizer's profile is created in the same commit when missing.
    #[tracing::instrument(skip(self, identity, form), fields(name = %form.name))]
    pub async fn create_conference(
        &self,
        identity: Option<&Identity>,
        form: ConferenceForm,
    ) -> Result<Conference, DomainError> {
        let identity = identity.ok_or(DomainError::Unauthorized)?;

        let mut work = CreateConference {
            conference_id: AggregateId::new(),
            identity: identity.clone(),
            form,
        };
        let conference = self.runner.transact(&mut work).await?;

        tracing::info!(conference_id = %work.conference_id, "conference created");
        Ok(conference)
    }

    /// Loads a conference by its caller-facing key.
    #[tracing::instrument(skip(self))]
    pub async fn get_conference(&self, conference_key: &str) -> Result<Conference, DomainError> {
        let not_found = || DomainError::ConferenceNotFound {
            key: conference_key.to_string(),
        };

        let key = ConferenceKey::parse(conference_key).ok_or_else(not_found)?;
        self.repository
            .load_existing(key.record_id())
            .await?
            .ok_or_else(not_found)
    }

    /// Conferences the caller is registered for, in registration order.
    ///
    /// Keys that no longer resolve to a conference are skipped.
    #[tracing::instrument(skip(self, identity))]
    pub async fn conferences_to_attend(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Vec<Conference>, DomainError> {
        let identity = identity.ok_or(DomainError::Unauthorized)?;
        let profile: Profile = self
            .repository
            .load_existing(profile_id(&identity.user_id))
            .await?
            .ok_or(DomainError::ProfileNotFound)?;

        let mut conferences = Vec::with_capacity(profile.conference_keys_to_attend().len());
        for key in profile.conference_keys_to_attend() {
            match self.repository.load_existing::<Conference>(key.record_id()).await? {
                Some(conference) => conferences.push(conference),
                None => tracing::debug!(%key, "registered conference no longer exists"),
            }
        }
        Ok(conferences)
    }
}

struct CreateConference {
    conference_id: AggregateId,
    identity: Identity,
    form: ConferenceForm,
}

#[async_trait]
impl<S: EntityStore + ?Sized> TransactionalWork<S> for CreateConference {
    type Output = Conference;

    async fn run(&mut self, tx: &mut Transaction<'_, S>) -> Result<Conference, DomainError> {
        let organizer_id = profile_id(&self.identity.user_id);
        let mut organizer: Profile = tx.load(organizer_id).await?;
        if !organizer.is_created() {
            let events = organizer.create(
                organizer_id,
                self.identity.user_id.clone(),
                &self.identity.email,
                &ProfileForm::default(),
            )?;
            tx.stage(organizer_id, &mut organizer, events)?;
        }

        let mut conference: Conference = tx.load(self.conference_id).await?;
        let events = conference.create(
            self.conference_id,
            self.identity.user_id.clone(),
            &self.form,
        )?;
        tx.stage(self.conference_id, &mut conference, events)?;

        Ok(conference)
    }
}

#[cfg(test)]
mod tests {
    use common::UserId;
    use entity_store::{EntityStoreExt, InMemoryEntityStore};

    use super::*;
    use crate::booking::BookingEngine;
    use crate::conference::ConferenceError;

    fn identity(name: &str) -> Identity {
        Identity::new(UserId::new(name).unwrap(), format!("{name}@example.com"))
    }

    #[tokio::test]
    async fn create_conference_sets_seats_and_organizer_profile() {
        let store = InMemoryEntityStore::new();
        let service = ConferenceService::new(store.clone());
        let org = identity("org");

        let conference = service
            .create_conference(
                Some(&org),
                ConferenceForm::new("RustConf", 25).with_topics(["Rust", "Systems"]),
            )
            .await
            .unwrap();

        assert_eq!(conference.max_attendees(), 25);
        assert_eq!(conference.seats_available(), 25);
        assert_eq!(conference.organizer(), Some(&org.user_id));
        assert_eq!(conference.topics(), &["Rust".to_string(), "Systems".to_string()]);
        assert!(
            store
                .record_exists(profile_id(&org.user_id))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn create_conference_requires_identity_and_name() {
        let service = ConferenceService::new(InMemoryEntityStore::new());

        assert!(matches!(
            service
                .create_conference(None, ConferenceForm::new("RustConf", 1))
                .await,
            Err(DomainError::Unauthorized)
        ));
        assert!(matches!(
            service
                .create_conference(Some(&identity("org")), ConferenceForm::new("", 1))
                .await,
            Err(DomainError::Conference(ConferenceError::NameRequired))
        ));
    }

    #[tokio::test]
    async fn get_conference_by_key() {
        let service = ConferenceService::new(InMemoryEntityStore::new());
        let created = service
            .create_conference(Some(&identity("org")), ConferenceForm::new("RustConf", 5))
            .await
            .unwrap();
        let key = created.key().unwrap().to_string();

        let loaded = service.get_conference(&key).await.unwrap();
        assert_eq!(loaded.id(), created.id());
        assert_eq!(loaded.name(), "RustConf");

        let unknown = AggregateId::new().to_string();
        let organizer_profile = profile_id(&identity("org").user_id).to_string();
        for missing in ["garbage", unknown.as_str(), organizer_profile.as_str()] {
            assert!(matches!(
                service.get_conference(missing).await,
                Err(DomainError::ConferenceNotFound { key }) if key == missing
            ));
        }
    }

    #[tokio::test]
    async fn conferences_to_attend_in_registration_order() {
        let store = InMemoryEntityStore::new();
        let service = ConferenceService::new(store.clone());
        let engine = BookingEngine::new(store);
        let org = identity("org");
        let ada = identity("ada");

        let mut keys = Vec::new();
        for name in ["First", "Second", "Third"] {
            let conference = service
                .create_conference(Some(&org), ConferenceForm::new(name, 10))
                .await
                .unwrap();
            keys.push(conference.key().unwrap().to_string());
        }

        for key in [&keys[2], &keys[0]] {
            engine.register(Some(&ada), key).await.unwrap();
        }

        let names: Vec<_> = service
            .conferences_to_attend(Some(&ada))
            .await
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["Third", "First"]);
    }

    #[tokio::test]
    async fn conferences_to_attend_requires_profile() {
        let service = ConferenceService::new(InMemoryEntityStore::new());
        assert!(matches!(
            service.conferences_to_attend(Some(&identity("nobody"))).await,
            Err(DomainError::ProfileNotFound)
        ));
        assert!(matches!(
            service.conferences_to_attend(None).await,
            Err(DomainError::Unauthorized)
        ));
    }
}
