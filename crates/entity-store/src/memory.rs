use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, Result, StoreError, Version,
    store::{Commit, EntityStore, validate_commit},
};

/// A failure the in-memory store can be told to raise on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Behave as if the backend were down.
    Unavailable,
    /// Behave as if another writer always got there first.
    Conflict,
}

#[derive(Debug, Clone)]
struct StreamHead {
    aggregate_type: String,
    version: Version,
}

#[derive(Debug, Default)]
struct State {
    events: Vec<EventEnvelope>,
    heads: HashMap<AggregateId, StreamHead>,
    failure: Option<(InjectedFailure, usize)>,
}

impl State {
    fn current_version(&self, aggregate_id: AggregateId) -> Version {
        self.heads
            .get(&aggregate_id)
            .map(|h| h.version)
            .unwrap_or(Version::initial())
    }

    /// Consumes one injected failure, if any is armed.
    fn take_failure(&mut self) -> Option<InjectedFailure> {
        let (failure, remaining) = self.failure.as_mut()?;
        let failure = *failure;
        *remaining -= 1;
        if *remaining == 0 {
            self.failure = None;
        }
        Some(failure)
    }
}

/// In-memory entity store.
///
/// The whole log sits behind one lock; a commit checks every expected version
/// and appends every change while holding the write lock, so commits are
/// atomic and serialized. Clones share the same storage.
#[derive(Clone, Default)]
pub struct InMemoryEntityStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored changes across all records.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }

    /// Makes the next `times` commits fail with `failure` without writing anything.
    pub async fn inject_failure(&self, failure: InjectedFailure, times: usize) {
        let mut state = self.state.write().await;
        state.failure = (times > 0).then_some((failure, times));
    }

    pub async fn clear_failures(&self) {
        self.state.write().await.failure = None;
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn commit(&self, commit: Commit) -> Result<Vec<Version>> {
        validate_commit(&commit)?;

        let mut state = self.state.write().await;

        match state.take_failure() {
            Some(InjectedFailure::Unavailable) => {
                return Err(StoreError::Unavailable(
                    "injected failure: store unavailable".to_string(),
                ));
            }
            Some(InjectedFailure::Conflict) => {
                let stream = &commit.streams[0];
                return Err(StoreError::ConcurrencyConflict {
                    aggregate_id: stream.aggregate_id,
                    expected: stream.expected_version,
                    actual: stream.expected_version.next(),
                });
            }
            None => {}
        }

        // Check every record before writing any of them.
        for stream in &commit.streams {
            let actual = state.current_version(stream.aggregate_id);
            if actual != stream.expected_version {
                metrics::counter!("entity_store_conflicts_total").increment(1);
                return Err(StoreError::ConcurrencyConflict {
                    aggregate_id: stream.aggregate_id,
                    expected: stream.expected_version,
                    actual,
                });
            }
        }

        let mut versions = Vec::with_capacity(commit.streams.len());
        for stream in commit.streams {
            let version = stream.resulting_version();
            let aggregate_type = stream.events[0].aggregate_type.clone();
            state.heads.insert(
                stream.aggregate_id,
                StreamHead {
                    aggregate_type,
                    version,
                },
            );
            state.events.extend(stream.events);
            versions.push(version);
        }

        metrics::counter!("entity_store_commits_total", "backend" => "memory").increment(1);
        tracing::trace!(transaction_id = %commit.transaction_id, "commit applied");

        Ok(versions)
    }

    async fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        let state = self.state.read().await;
        let mut events: Vec<_> = state
            .events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn stream_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let state = self.state.read().await;
        Ok(state.heads.get(&aggregate_id).map(|h| h.version))
    }

    async fn list_records(&self, aggregate_type: &str) -> Result<Vec<AggregateId>> {
        let state = self.state.read().await;
        let mut ids: Vec<_> = state
            .heads
            .iter()
            .filter(|(_, head)| head.aggregate_type == aggregate_type)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EntityStoreExt, StreamAppend};

    fn change(aggregate_id: AggregateId, aggregate_type: &str, version: i64) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type(aggregate_type)
            .event_type("Changed")
            .version(Version::new(version))
            .payload(&serde_json::json!({ "n": version }))
            .unwrap()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn append_creates_record() {
        let store = InMemoryEntityStore::new();
        let id = AggregateId::new();

        let version = store
            .append_stream(StreamAppend::new(
                id,
                Version::initial(),
                vec![change(id, "Profile", 1)],
            ))
            .await
            .unwrap();

        assert_eq!(version, Version::first());
        assert_eq!(store.stream_version(id).await.unwrap(), Some(Version::first()));
        assert!(store.record_exists(id).await.unwrap());
        assert_eq!(store.load_stream(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn commit_spans_two_records() {
        let store = InMemoryEntityStore::new();
        let conference = AggregateId::new();
        let profile = AggregateId::new();

        store
            .append_stream(StreamAppend::new(
                conference,
                Version::initial(),
                vec![change(conference, "Conference", 1)],
            ))
            .await
            .unwrap();

        let versions = store
            .commit(
                Commit::new()
                    .stream(StreamAppend::new(
                        conference,
                        Version::first(),
                        vec![change(conference, "Conference", 2)],
                    ))
                    .stream(StreamAppend::new(
                        profile,
                        Version::initial(),
                        vec![change(profile, "Profile", 1), change(profile, "Profile", 2)],
                    )),
            )
            .await
            .unwrap();

        assert_eq!(versions, vec![Version::new(2), Version::new(2)]);
        assert_eq!(store.event_count().await, 4);
    }

    #[tokio::test]
    async fn conflict_on_one_record_writes_nothing() {
        let store = InMemoryEntityStore::new();
        let conference = AggregateId::new();
        let profile = AggregateId::new();

        store
            .append_stream(StreamAppend::new(
                conference,
                Version::initial(),
                vec![change(conference, "Conference", 1)],
            ))
            .await
            .unwrap();

        // Profile is fine, conference is stale.
        let result = store
            .commit(
                Commit::new()
                    .stream(StreamAppend::new(
                        profile,
                        Version::initial(),
                        vec![change(profile, "Profile", 1)],
                    ))
                    .stream(StreamAppend::new(
                        conference,
                        Version::initial(),
                        vec![change(conference, "Conference", 1)],
                    )),
            )
            .await;

        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict { actual, .. }) if actual == Version::first()
        ));
        assert_eq!(store.stream_version(profile).await.unwrap(), None);
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn invalid_commit_is_rejected() {
        let store = InMemoryEntityStore::new();
        let result = store.commit(Commit::new()).await;
        assert!(matches!(result, Err(StoreError::InvalidCommit(_))));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = InMemoryEntityStore::new();
        let id = AggregateId::new();
        store.inject_failure(InjectedFailure::Unavailable, 1).await;

        let append = StreamAppend::new(id, Version::initial(), vec![change(id, "Profile", 1)]);
        let first = store.append_stream(append.clone()).await;
        assert!(matches!(first, Err(StoreError::Unavailable(_))));
        assert_eq!(store.event_count().await, 0);

        let second = store.append_stream(append).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn injected_conflict_reports_conflict() {
        let store = InMemoryEntityStore::new();
        let id = AggregateId::new();
        store.inject_failure(InjectedFailure::Conflict, 2).await;

        let append = StreamAppend::new(id, Version::initial(), vec![change(id, "Profile", 1)]);
        for _ in 0..2 {
            let err = store.append_stream(append.clone()).await.unwrap_err();
            assert!(err.is_conflict());
        }
        store.clear_failures().await;
        assert!(store.append_stream(append).await.is_ok());
    }

    #[tokio::test]
    async fn list_records_filters_by_type() {
        let store = InMemoryEntityStore::new();
        let c1 = AggregateId::new();
        let c2 = AggregateId::new();
        let p1 = AggregateId::new();

        for (id, ty) in [(c1, "Conference"), (c2, "Conference"), (p1, "Profile")] {
            store
                .append_stream(StreamAppend::new(
                    id,
                    Version::initial(),
                    vec![change(id, ty, 1)],
                ))
                .await
                .unwrap();
        }

        let mut expected = vec![c1, c2];
        expected.sort();
        assert_eq!(store.list_records("Conference").await.unwrap(), expected);
        assert_eq!(store.list_records("Profile").await.unwrap(), vec![p1]);
        assert!(store.list_records("Unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_stream_returns_version_order() {
        let store = InMemoryEntityStore::new();
        let id = AggregateId::new();

        store
            .append_stream(StreamAppend::new(
                id,
                Version::initial(),
                vec![change(id, "Conference", 1), change(id, "Conference", 2)],
            ))
            .await
            .unwrap();
        store
            .append_stream(StreamAppend::new(
                id,
                Version::new(2),
                vec![change(id, "Conference", 3)],
            ))
            .await
            .unwrap();

        let versions: Vec<_> = store
            .load_stream(id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.version.as_i64())
            .collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }
}
