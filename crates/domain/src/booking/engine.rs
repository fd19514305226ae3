//! The booking engine.

use async_trait::async_trait;
use entity_store::EntityStore;

use crate::aggregate::Aggregate;
use crate::config::BookingConfig;
use crate::conference::{Conference, ConferenceError, ConferenceKey};
use crate::error::DomainError;
use crate::identity::Identity;
use crate::profile::{Profile, ProfileForm, profile_id};
use crate::transaction::{Transaction, TransactionRunner, TransactionalWork};

use super::{BookingOutcome, BookingReason};

/// Registers and unregisters users for conferences.
///
/// Each call reads the conference and the caller's profile, decides, and
/// writes both in one commit. A lost race is retried from a fresh read, so
/// the loser of the last seat sees `SOLD_OUT` rather than an oversold
/// success.
///
/// Only precondition failures come back as `Err`: a missing identity
/// ([`DomainError::Unauthorized`]) and, for unregister, a missing profile
/// ([`DomainError::ProfileNotFound`]). Every other failure is logged and
/// reported as [`BookingReason::InternalError`] with nothing written.
#[derive(Clone)]
pub struct BookingEngine<S> {
    runner: TransactionRunner<S>,
}

impl<S: EntityStore> BookingEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, BookingConfig::default())
    }

    pub fn with_config(store: S, config: BookingConfig) -> Self {
        Self {
            runner: TransactionRunner::with_config(store, config),
        }
    }

    pub fn store(&self) -> &S {
        self.runner.store()
    }

    /// Books a seat at `conference_key` for the caller.
    #[tracing::instrument(skip(self, identity), fields(user_id))]
    pub async fn register(
        &self,
        identity: Option<&Identity>,
        conference_key: &str,
    ) -> Result<BookingOutcome, DomainError> {
        let identity = identity.ok_or(DomainError::Unauthorized)?;
        tracing::Span::current().record("user_id", identity.user_id.as_str());

        let mut work = Register {
            identity: identity.clone(),
            key: ConferenceKey::parse(conference_key),
        };
        settle("register", self.runner.transact(&mut work).await)
    }

    /// Gives the caller's seat at `conference_key` back.
    #[tracing::instrument(skip(self, identity), fields(user_id))]
    pub async fn unregister(
        &self,
        identity: Option<&Identity>,
        conference_key: &str,
    ) -> Result<BookingOutcome, DomainError> {
        let identity = identity.ok_or(DomainError::Unauthorized)?;
        tracing::Span::current().record("user_id", identity.user_id.as_str());

        let mut work = Unregister {
            identity: identity.clone(),
            key: ConferenceKey::parse(conference_key),
        };
        settle("unregister", self.runner.transact(&mut work).await)
    }
}

/// Turns a transaction result into the caller's outcome.
fn settle(
    operation: &'static str,
    result: Result<BookingOutcome, DomainError>,
) -> Result<BookingOutcome, DomainError> {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) if e.is_precondition() => return Err(e),
        Err(e) => {
            tracing::error!(operation, error = %e, "booking failed");
            BookingOutcome::internal_error()
        }
    };

    metrics::counter!(
        "booking_outcomes_total",
        "operation" => operation,
        "reason" => outcome.reason().as_str()
    )
    .increment(1);

    if outcome.success() {
        tracing::info!(operation, "booking committed");
    } else {
        tracing::debug!(operation, reason = %outcome.reason(), "booking rejected");
    }

    Ok(outcome)
}

struct Register {
    identity: Identity,
    key: Option<ConferenceKey>,
}

#[async_trait]
impl<S: EntityStore + ?Sized> TransactionalWork<S> for Register {
    type Output = BookingOutcome;

    async fn run(&mut self, tx: &mut Transaction<'_, S>) -> Result<BookingOutcome, DomainError> {
        let Some(key) = self.key else {
            return Ok(BookingOutcome::from_reason(BookingReason::EventNotFound));
        };
        let Some(mut conference) = tx.load_existing::<Conference>(key.record_id()).await? else {
            return Ok(BookingOutcome::from_reason(BookingReason::EventNotFound));
        };

        let profile_id = profile_id(&self.identity.user_id);
        let mut profile: Profile = tx.load(profile_id).await?;

        if profile.attends(key) {
            return Ok(BookingOutcome::from_reason(BookingReason::AlreadyRegistered));
        }

        let seat = match conference.book_seat() {
            Ok(events) => events,
            Err(ConferenceError::SoldOut { .. }) => {
                return Ok(BookingOutcome::from_reason(BookingReason::SoldOut));
            }
            Err(e) => return Err(e.into()),
        };

        // A new profile is only written together with its first booking.
        let mut attendance = if profile.is_created() {
            Vec::new()
        } else {
            profile.create(
                profile_id,
                self.identity.user_id.clone(),
                &self.identity.email,
                &ProfileForm::default(),
            )?
        };
        attendance.extend(profile.add_attendance(key)?);

        tx.stage(key.record_id(), &mut conference, seat)?;
        tx.stage(profile_id, &mut profile, attendance)?;

        Ok(BookingOutcome::ok())
    }
}

struct Unregister {
    identity: Identity,
    key: Option<ConferenceKey>,
}

#[async_trait]
impl<S: EntityStore + ?Sized> TransactionalWork<S> for Unregister {
    type Output = BookingOutcome;

    async fn run(&mut self, tx: &mut Transaction<'_, S>) -> Result<BookingOutcome, DomainError> {
        let profile_id = profile_id(&self.identity.user_id);
        let Some(mut profile) = tx.load_existing::<Profile>(profile_id).await? else {
            return Err(DomainError::ProfileNotFound);
        };

        let Some(key) = self.key else {
            return Ok(BookingOutcome::from_reason(BookingReason::EventNotFound));
        };
        let Some(mut conference) = tx.load_existing::<Conference>(key.record_id()).await? else {
            return Ok(BookingOutcome::from_reason(BookingReason::EventNotFound));
        };

        if !profile.attends(key) {
            return Ok(BookingOutcome::from_reason(BookingReason::NotRegistered));
        }

        let seat = conference.release_seat()?;
        let attendance = profile.remove_attendance(key)?;

        tx.stage(key.record_id(), &mut conference, seat)?;
        tx.stage(profile_id, &mut profile, attendance)?;

        Ok(BookingOutcome::ok())
    }
}
