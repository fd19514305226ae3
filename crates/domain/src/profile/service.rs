//! Profile service: explicit get-or-create and profile edits.

use async_trait::async_trait;
use entity_store::EntityStore;

use crate::aggregate::Aggregate;
use crate::config::BookingConfig;
use crate::error::DomainError;
use crate::identity::Identity;
use crate::repository::Repository;
use crate::transaction::{Transaction, TransactionRunner, TransactionalWork};

use super::{Profile, ProfileForm, profile_id};

/// Service for reading and saving the caller's profile.
#[derive(Clone)]
pub struct ProfileService<S> {
    runner: TransactionRunner<S>,
    repository: Repository<S>,
}

impl<S: EntityStore + Clone> ProfileService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, BookingConfig::default())
    }

    pub fn with_config(store: S, config: BookingConfig) -> Self {
        Self {
            runner: TransactionRunner::with_config(store.clone(), config),
            repository: Repository::new(store),
        }
    }

    /// Returns the caller's profile, or `None` if they never created one.
    #[tracing::instrument(skip(self, identity))]
    pub async fn get_profile(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Option<Profile>, DomainError> {
        let identity = identity.ok_or(DomainError::Unauthorized)?;
        self.repository
            .load_existing(profile_id(&identity.user_id))
            .await
    }

    /// Returns the caller's profile, creating it with defaults when missing.
    #[tracing::instrument(skip(self, identity))]
    pub async fn get_or_create_profile(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Profile, DomainError> {
        let identity = identity.ok_or(DomainError::Unauthorized)?;
        let mut work = SaveProfile {
            identity: identity.clone(),
            form: None,
        };
        self.runner.transact(&mut work).await
    }

    /// Creates the caller's profile from `form`, or updates the fields it sets.
    #[tracing::instrument(skip(self, identity))]
    pub async fn save_profile(
        &self,
        identity: Option<&Identity>,
        form: ProfileForm,
    ) -> Result<Profile, DomainError> {
        let identity = identity.ok_or(DomainError::Unauthorized)?;
        let mut work = SaveProfile {
            identity: identity.clone(),
            form: Some(form),
        };
        self.runner.transact(&mut work).await
    }
}

/// Creates the profile if missing; with a form, also applies its fields.
struct SaveProfile {
    identity: Identity,
    form: Option<ProfileForm>,
}

#[async_trait]
impl<S: EntityStore + ?Sized> TransactionalWork<S> for SaveProfile {
    type Output = Profile;

    async fn run(&mut self, tx: &mut Transaction<'_, S>) -> Result<Profile, DomainError> {
        let id = profile_id(&self.identity.user_id);
        let mut profile: Profile = tx.load(id).await?;
        let form = self.form.clone().unwrap_or_default();

        let events = if profile.is_created() {
            profile.update(&form)?
        } else {
            profile.create(
                id,
                self.identity.user_id.clone(),
                &self.identity.email,
                &form,
            )?
        };
        tx.stage(id, &mut profile, events)?;

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use common::UserId;
    use entity_store::{InMemoryEntityStore, Version};

    use super::*;
    use crate::profile::TeeShirtSize;

    fn identity(name: &str, email: &str) -> Identity {
        Identity::new(UserId::new(name).unwrap(), email)
    }

    #[tokio::test]
    async fn get_profile_is_none_before_creation() {
        let service = ProfileService::new(InMemoryEntityStore::new());
        let ada = identity("ada", "ada@example.com");
        assert!(service.get_profile(Some(&ada)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn calls_without_identity_are_unauthorized() {
        let service = ProfileService::new(InMemoryEntityStore::new());
        assert!(matches!(
            service.get_profile(None).await,
            Err(DomainError::Unauthorized)
        ));
        assert!(matches!(
            service.get_or_create_profile(None).await,
            Err(DomainError::Unauthorized)
        ));
        assert!(matches!(
            service.save_profile(None, ProfileForm::new()).await,
            Err(DomainError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn get_or_create_uses_defaults_once() {
        let store = InMemoryEntityStore::new();
        let service = ProfileService::new(store.clone());
        let ada = identity("ada", "ada.lovelace@example.com");

        let created = service.get_or_create_profile(Some(&ada)).await.unwrap();
        assert_eq!(created.display_name(), "ada.lovelace");
        assert_eq!(created.main_email(), "ada.lovelace@example.com");
        assert_eq!(created.tee_shirt_size(), TeeShirtSize::NotSpecified);
        assert!(created.conference_keys_to_attend().is_empty());

        let again = service.get_or_create_profile(Some(&ada)).await.unwrap();
        assert_eq!(again.version(), Version::first());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn email_without_at_sign_is_whole_display_name() {
        let service = ProfileService::new(InMemoryEntityStore::new());
        let local = identity("local", "localuser");
        let profile = service.get_or_create_profile(Some(&local)).await.unwrap();
        assert_eq!(profile.display_name(), "localuser");
    }

    #[tokio::test]
    async fn save_profile_creates_then_updates() {
        let service = ProfileService::new(InMemoryEntityStore::new());
        let ada = identity("ada", "ada@example.com");

        let created = service
            .save_profile(
                Some(&ada),
                ProfileForm::new().with_tee_shirt_size(TeeShirtSize::S),
            )
            .await
            .unwrap();
        assert_eq!(created.display_name(), "ada");
        assert_eq!(created.tee_shirt_size(), TeeShirtSize::S);

        let updated = service
            .save_profile(Some(&ada), ProfileForm::new().with_display_name("Countess"))
            .await
            .unwrap();
        assert_eq!(updated.display_name(), "Countess");
        assert_eq!(updated.tee_shirt_size(), TeeShirtSize::S);
        assert_eq!(updated.version(), Version::new(2));

        let loaded = service.get_profile(Some(&ada)).await.unwrap().unwrap();
        assert_eq!(loaded.display_name(), "Countess");
    }
}
