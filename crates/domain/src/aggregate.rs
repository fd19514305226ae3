//! Core record and change traits.

use common::AggregateId;
use entity_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A change to a record, named in the past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Change type name stored alongside the payload.
    fn event_type(&self) -> &'static str;
}

/// A record rebuilt from its stream of changes.
///
/// Command methods on a record never mutate it: they validate against the
/// current state and return the changes to stage. State only moves through
/// [`Aggregate::apply`], which must be pure and infallible because the
/// changes it receives have already happened.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;

    type Error: std::error::Error + Send + Sync;

    /// Record type name used to group streams in the store.
    fn aggregate_type() -> &'static str;

    /// Returns `None` until the creation change has been applied.
    fn id(&self) -> Option<AggregateId>;

    /// Version of the last applied change, `0` for a record never written.
    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }

    fn is_created(&self) -> bool {
        self.id().is_some()
    }
}
