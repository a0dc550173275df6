use photo_insight::db::{MetadataStore, SqliteMetadataStore, VectorStore};
use photo_insight::season::Season;
use photo_insight::services::{
    CancelFlag, ChannelSink, ClassifyService, IngestService, ProgressEvent,
};
use photo_insight::testing::{
    FlakyEmbedding, RecordingSink, ScriptedClassifier, TestEmbedding, TestVectorStore,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const DIMS: usize = 8;

fn fake_photo(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"pixels").unwrap();
    path
}

fn ingest_service(
    store: &Arc<SqliteMetadataStore>,
    vectors: &Arc<TestVectorStore>,
) -> IngestService {
    IngestService::new(
        store.clone(),
        vectors.clone(),
        Arc::new(TestEmbedding::new(DIMS)),
    )
    .with_pace(Duration::ZERO)
}

// -- Tests --

#[tokio::test]
async fn ingest_then_classify_end_to_end() {
    let photos = TempDir::new().unwrap();
    fake_photo(&photos, "meadow.jpg");
    fake_photo(&photos, "beach.png");
    fake_photo(&photos, "blizzard.webp");
    std::fs::write(photos.path().join("notes.txt"), b"not a photo").unwrap();

    let store = Arc::new(SqliteMetadataStore::open_in_memory().unwrap());
    let vectors = Arc::new(TestVectorStore::new(DIMS));

    let summary = ingest_service(&store, &vectors)
        .run(photos.path(), &RecordingSink::default(), &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.indexed, 3);
    assert_eq!(vectors.count().await.unwrap(), 3);

    let classifier = Arc::new(
        ScriptedClassifier::new()
            .with("meadow.jpg", Season::Spring)
            .with("beach.png", Season::Summer)
            .with("blizzard.webp", Season::Winter),
    );
    let summary = ClassifyService::new(store.clone(), classifier)
        .with_pace(Duration::ZERO)
        .run(&RecordingSink::default(), &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(summary.examined, 3);
    assert_eq!(summary.labeled, 3);

    for (season, filename) in [
        (Season::Spring, "meadow.jpg"),
        (Season::Summer, "beach.png"),
        (Season::Winter, "blizzard.webp"),
    ] {
        let members = store.list_season_members(season, 0, 10).await.unwrap();
        assert_eq!(members.len(), 1, "wrong member count for {season}");
        assert_eq!(members[0].filename, filename);
    }
    assert!(store
        .list_season_members(Season::Autumn, 0, 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn double_ingestion_is_idempotent() {
    let photos = TempDir::new().unwrap();
    fake_photo(&photos, "a.jpg");
    fake_photo(&photos, "b.jpg");
    fake_photo(&photos, "c.jpg");

    let store = Arc::new(SqliteMetadataStore::open_in_memory().unwrap());
    let vectors = Arc::new(TestVectorStore::new(DIMS));
    let service = ingest_service(&store, &vectors);

    service
        .run(photos.path(), &RecordingSink::default(), &CancelFlag::new())
        .await
        .unwrap();
    let after_first = store.list_all().await.unwrap();

    let second = service
        .run(photos.path(), &RecordingSink::default(), &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(second.indexed, 0);
    assert_eq!(second.skipped, 3);

    let after_second = store.list_all().await.unwrap();
    assert_eq!(after_first, after_second);

    // Unique paths and unique embedding references.
    let paths: HashSet<_> = after_second.iter().map(|r| r.path.clone()).collect();
    assert_eq!(paths.len(), 3);
    let refs: Vec<_> = after_second
        .iter()
        .filter_map(|r| r.vector_id.clone())
        .collect();
    let unique_refs: HashSet<_> = refs.iter().cloned().collect();
    assert_eq!(unique_refs.len(), refs.len());
    assert_eq!(vectors.count().await.unwrap(), 3);
}

#[tokio::test]
async fn stores_stay_consistent_when_embedding_fails() {
    let photos = TempDir::new().unwrap();
    fake_photo(&photos, "a.jpg");
    fake_photo(&photos, "b.jpg");
    fake_photo(&photos, "c.jpg");

    let store = Arc::new(SqliteMetadataStore::open_in_memory().unwrap());
    let vectors = Arc::new(TestVectorStore::new(DIMS));

    let service = IngestService::new(
        store.clone(),
        vectors.clone(),
        Arc::new(FlakyEmbedding::failing_on("b.jpg", DIMS)),
    )
    .with_pace(Duration::ZERO);
    service
        .run(photos.path(), &RecordingSink::default(), &CancelFlag::new())
        .await
        .unwrap();

    // Every attached reference has a backing vector, and rows without a
    // reference have no vector at all.
    let records = store.list_all().await.unwrap();
    let stored: HashSet<_> = vectors.stored_ids().into_iter().collect();
    let attached: HashSet<_> = records.iter().filter_map(|r| r.vector_id.clone()).collect();
    assert_eq!(stored, attached);
    assert_eq!(attached.len(), 2);

    let b = records.iter().find(|r| r.filename == "b.jpg").unwrap();
    assert!(!b.is_fully_indexed());

    // The failed file is retried on the next pass and catches up.
    let recovered = ingest_service(&store, &vectors)
        .run(photos.path(), &RecordingSink::default(), &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(recovered.indexed, 1);
    assert_eq!(recovered.skipped, 2);
    assert_eq!(vectors.count().await.unwrap(), 3);
}

#[tokio::test]
async fn reclassification_does_not_duplicate_memberships() {
    let photos = TempDir::new().unwrap();
    fake_photo(&photos, "a.jpg");

    let store = Arc::new(SqliteMetadataStore::open_in_memory().unwrap());
    let vectors = Arc::new(TestVectorStore::new(DIMS));
    ingest_service(&store, &vectors)
        .run(photos.path(), &RecordingSink::default(), &CancelFlag::new())
        .await
        .unwrap();

    let classifier = Arc::new(ScriptedClassifier::new().with("a.jpg", Season::Autumn));
    let service = ClassifyService::new(store.clone(), classifier).with_pace(Duration::ZERO);

    for _ in 0..3 {
        let summary = service
            .run(&RecordingSink::default(), &CancelFlag::new())
            .await
            .unwrap();
        assert_eq!(summary.labeled, 1);
        assert_eq!(summary.failed, 0);
    }

    let members = store.list_season_members(Season::Autumn, 0, 10).await.unwrap();
    assert_eq!(members.len(), 1);
}

#[tokio::test]
async fn partial_rows_are_invisible_to_classification() {
    let photos = TempDir::new().unwrap();
    fake_photo(&photos, "good.jpg");
    fake_photo(&photos, "stuck.jpg");

    let store = Arc::new(SqliteMetadataStore::open_in_memory().unwrap());
    let vectors = Arc::new(TestVectorStore::new(DIMS));
    IngestService::new(
        store.clone(),
        vectors,
        Arc::new(FlakyEmbedding::failing_on("stuck.jpg", DIMS)),
    )
    .with_pace(Duration::ZERO)
    .run(photos.path(), &RecordingSink::default(), &CancelFlag::new())
    .await
    .unwrap();

    // Both files would classify, but only the indexed one is examined.
    let classifier = Arc::new(
        ScriptedClassifier::new()
            .with("good.jpg", Season::Summer)
            .with("stuck.jpg", Season::Summer),
    );
    let summary = ClassifyService::new(store.clone(), classifier)
        .with_pace(Duration::ZERO)
        .run(&RecordingSink::default(), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(summary.examined, 1);
    let members = store.list_season_members(Season::Summer, 0, 10).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].filename, "good.jpg");
}

#[tokio::test]
async fn channel_sink_streams_pipeline_events_in_order() {
    let photos = TempDir::new().unwrap();
    fake_photo(&photos, "a.jpg");

    let store = Arc::new(SqliteMetadataStore::open_in_memory().unwrap());
    let vectors = Arc::new(TestVectorStore::new(DIMS));
    let (sink, mut rx) = ChannelSink::new();

    ingest_service(&store, &vectors)
        .run(photos.path(), &sink, &CancelFlag::new())
        .await
        .unwrap();
    drop(sink);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(matches!(
        events.first(),
        Some(ProgressEvent::IndexingStatus { .. })
    ));
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::NewImageFound { .. })));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::IndexingComplete { summary }) if summary.indexed == 1
    ));
}
