use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use entity_store::{
    Commit, EntityStore, EntityStoreExt, EventEnvelope, InMemoryEntityStore, StreamAppend, Version,
};

fn make_change(aggregate_id: AggregateId, aggregate_type: &str, version: i64) -> EventEnvelope {
    EventEnvelope::builder()
        .aggregate_id(aggregate_id)
        .aggregate_type(aggregate_type)
        .event_type("SeatBooked")
        .version(Version::new(version))
        .payload(&serde_json::json!({ "type": "SeatBooked" }))
        .unwrap()
        .build()
        .unwrap()
}

fn bench_append_single_record(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("entity_store/append_single_record", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEntityStore::new();
                let id = AggregateId::new();
                store
                    .append_stream(StreamAppend::new(
                        id,
                        Version::initial(),
                        vec![make_change(id, "Conference", 1)],
                    ))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_commit_two_records(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("entity_store/commit_two_records", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEntityStore::new();
                let conference = AggregateId::new();
                let profile = AggregateId::new();
                store
                    .commit(
                        Commit::new()
                            .stream(StreamAppend::new(
                                conference,
                                Version::initial(),
                                vec![make_change(conference, "Conference", 1)],
                            ))
                            .stream(StreamAppend::new(
                                profile,
                                Version::initial(),
                                vec![make_change(profile, "Profile", 1)],
                            )),
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_load_stream(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEntityStore::new();
    let id = AggregateId::new();

    // Pre-populate with 100 changes
    rt.block_on(async {
        let changes: Vec<_> = (1..=100).map(|v| make_change(id, "Conference", v)).collect();
        store
            .append_stream(StreamAppend::new(id, Version::initial(), changes))
            .await
            .unwrap();
    });

    c.bench_function("entity_store/load_stream_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.load_stream(id).await.unwrap();
            });
        });
    });
}

fn bench_stale_commit_rejected(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEntityStore::new();
    let id = AggregateId::new();

    rt.block_on(async {
        store
            .append_stream(StreamAppend::new(
                id,
                Version::initial(),
                vec![make_change(id, "Conference", 1)],
            ))
            .await
            .unwrap();
    });

    c.bench_function("entity_store/stale_commit_rejected", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = store
                    .append_stream(StreamAppend::new(
                        id,
                        Version::initial(),
                        vec![make_change(id, "Conference", 1)],
                    ))
                    .await;
                assert!(result.is_err());
            });
        });
    });
}

criterion_group!(
    benches,
    bench_append_single_record,
    bench_commit_two_records,
    bench_load_stream,
    bench_stale_commit_rejected,
);
criterion_main!(benches);
