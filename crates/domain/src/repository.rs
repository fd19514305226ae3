//! Read access to records outside a transaction.

use common::AggregateId;
use entity_store::{EntityStore, EventEnvelope};

use crate::aggregate::Aggregate;
use crate::error::DomainError;

/// Rebuilds a record by replaying its stored changes.
///
/// A record with no changes comes back as `A::default()` at version 0, and
/// so does a stream written for another record type: there is no `A` there.
pub(crate) fn rebuild<A: Aggregate>(events: Vec<EventEnvelope>) -> Result<A, DomainError> {
    let mut aggregate = A::default();
    if let Some(other) = events
        .iter()
        .find(|envelope| envelope.aggregate_type != A::aggregate_type())
    {
        tracing::debug!(
            aggregate_id = %other.aggregate_id,
            expected = A::aggregate_type(),
            found = %other.aggregate_type,
            "record has another type"
        );
        return Ok(aggregate);
    }

    for envelope in events {
        let event: A::Event = serde_json::from_value(envelope.payload)?;
        aggregate.apply(event);
        aggregate.set_version(envelope.version);
    }
    Ok(aggregate)
}

pub(crate) async fn load_record<S, A>(store: &S, id: AggregateId) -> Result<A, DomainError>
where
    S: EntityStore + ?Sized,
    A: Aggregate,
{
    let events = store.load_stream(id).await?;
    rebuild(events)
}

/// Read-only view of the records in a store.
///
/// Values returned here are snapshots; changes always go through a
/// [`Transaction`](crate::Transaction).
#[derive(Clone)]
pub struct Repository<S> {
    store: S,
}

impl<S: EntityStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads a record, returning a default instance if it doesn't exist.
    pub async fn load<A: Aggregate>(&self, id: AggregateId) -> Result<A, DomainError> {
        load_record(&self.store, id).await
    }

    /// Loads a record, returning `None` if it doesn't exist.
    pub async fn load_existing<A: Aggregate>(
        &self,
        id: AggregateId,
    ) -> Result<Option<A>, DomainError> {
        let aggregate: A = self.load(id).await?;
        Ok(aggregate.is_created().then_some(aggregate))
    }
}

#[cfg(test)]
mod tests {
    use common::UserId;
    use entity_store::InMemoryEntityStore;

    use super::*;
    use crate::conference::Conference;
    use crate::identity::Identity;
    use crate::profile::{Profile, ProfileService, profile_id};

    #[tokio::test]
    async fn record_of_another_type_is_missing() {
        let store = InMemoryEntityStore::new();
        let ada = Identity::new(UserId::new("ada").unwrap(), "ada@example.com");
        ProfileService::new(store.clone())
            .get_or_create_profile(Some(&ada))
            .await
            .unwrap();

        let repository = Repository::new(store);
        let id = profile_id(&ada.user_id);
        assert!(
            repository
                .load_existing::<Conference>(id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            repository
                .load_existing::<Profile>(id)
                .await
                .unwrap()
                .is_some()
        );
    }
}
