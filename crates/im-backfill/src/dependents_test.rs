use crate::test_support::*;
use crate::progress::{BatchProgress, ProgressObserver};
use crate::{BackfillJob, BackfillOptions, JobError};

async fn store_with_members() -> ProbeStore {
    ProbeStore::seeded(&format!("{MESSAGES_SQL}{MEMBERS_SQL}")).await
}

fn opts(batch_size: usize) -> BackfillOptions {
    BackfillOptions {
        batch_size,
        ..Default::default()
    }
}

fn cursors(store: &ProbeStore) -> Vec<(i64, Option<String>)> {
    store.ids("channel_members", "last_seen_public_id")
}

fn public_id(store: &ProbeStore, key: i64) -> Option<String> {
    store
        .public_ids()
        .into_iter()
        .find(|(k, _)| *k == key)
        .and_then(|(_, id)| id)
}

#[tokio::test]
async fn test_resolves_cursors_and_leaves_orphans() {
    let store = store_with_members().await;
    let mut job = BackfillJob::new(&store);
    job.run(&messages(), &opts(10)).await.unwrap();

    let summary = job
        .resolve_dependents(&channel_members(), &messages(), &opts(10))
        .await
        .unwrap();
    assert_eq!(summary.pending_before, 3);
    assert_eq!(summary.rows_updated, 2);
    assert_eq!(summary.rows_skipped, 0);
    assert_eq!(summary.unresolved, 1);
    assert_eq!(summary.orphaned, 1);
    assert_eq!(summary.awaiting_parent, 0);
    assert_eq!(summary.batches, 1);

    let cursors = cursors(&store);
    assert_eq!(cursors[0].1, public_id(&store, 1));
    assert_eq!(cursors[1].1, public_id(&store, 3));
    // Reference to a missing message, and no reference at all
    assert_eq!(cursors[2].1, None);
    assert_eq!(cursors[3].1, None);
}

#[tokio::test]
async fn test_partially_migrated_parent() {
    let store = store_with_members().await;
    let mut job = BackfillJob::new(&store);
    // Only message 1 gets an identifier
    let first = BackfillOptions {
        batch_size: 1,
        max_batches: Some(1),
        ..Default::default()
    };
    job.run(&messages(), &first).await.unwrap();

    let summary = job
        .resolve_dependents(&channel_members(), &messages(), &opts(10))
        .await
        .unwrap();
    assert_eq!(summary.rows_updated, 1);
    assert_eq!(summary.awaiting_parent, 1);
    assert_eq!(summary.orphaned, 1);
    assert_eq!(summary.unresolved, 2);

    job.run(&messages(), &opts(10)).await.unwrap();
    let summary = job
        .resolve_dependents(&channel_members(), &messages(), &opts(10))
        .await
        .unwrap();
    assert_eq!(summary.rows_updated, 1);
    assert_eq!(summary.awaiting_parent, 0);
    assert_eq!(cursors(&store)[1].1, public_id(&store, 3));
}

#[tokio::test]
async fn test_resolving_twice_is_a_no_op() {
    let store = store_with_members().await;
    let mut job = BackfillJob::new(&store);
    job.run(&messages(), &opts(10)).await.unwrap();
    job.resolve_dependents(&channel_members(), &messages(), &opts(10))
        .await
        .unwrap();
    let before = cursors(&store);

    let again = job
        .resolve_dependents(&channel_members(), &messages(), &opts(10))
        .await
        .unwrap();
    assert_eq!(again.rows_updated, 0);
    assert_eq!(again.batches, 0);
    assert_eq!(cursors(&store), before);
}

#[tokio::test]
async fn test_dependent_batches() {
    let store = store_with_members().await;
    let mut job = BackfillJob::new(&store);
    job.run(&messages(), &opts(10)).await.unwrap();
    let primary_batches = store.batch_sizes().len();

    let summary = job
        .resolve_dependents(&channel_members(), &messages(), &opts(1))
        .await
        .unwrap();
    assert_eq!(summary.batches, 2);
    assert_eq!(store.batch_sizes()[primary_batches..], [1, 1]);
}

#[tokio::test]
async fn test_dry_run_resolves_nothing() {
    let store = store_with_members().await;
    let mut job = BackfillJob::new(&store);
    job.run(&messages(), &opts(10)).await.unwrap();

    let dry = BackfillOptions {
        dry_run: true,
        ..Default::default()
    };
    let summary = job
        .resolve_dependents(&channel_members(), &messages(), &dry)
        .await
        .unwrap();
    assert!(summary.dry_run);
    assert_eq!(summary.rows_updated, 0);
    assert_eq!(summary.unresolved, 3);
    assert_eq!(summary.orphaned, 1);
    assert!(cursors(&store).iter().all(|(_, c)| c.is_none()));
}

#[tokio::test]
async fn test_missing_cursor_column_is_schema_error() {
    let store = ProbeStore::seeded(&format!(
        "{MESSAGES_SQL}
         CREATE TABLE channel_members (id INTEGER PRIMARY KEY, last_seen_message_id INTEGER);"
    ))
    .await;
    let mut job = BackfillJob::new(&store);
    let err = job
        .resolve_dependents(&channel_members(), &messages(), &opts(10))
        .await
        .unwrap_err();
    match err {
        JobError::Schema { table, message } => {
            assert_eq!(table, "channel_members");
            assert!(message.contains("last_seen_public_id"), "{message}");
        }
        other => panic!("expected schema error, got {other}"),
    }
}

#[tokio::test]
async fn test_parent_without_identifier_column_is_schema_error() {
    let store = ProbeStore::seeded(&format!(
        "CREATE TABLE group_messages (id INTEGER PRIMARY KEY, created_at TIMESTAMP);{MEMBERS_SQL}"
    ))
    .await;
    let mut job = BackfillJob::new(&store);
    let err = job
        .resolve_dependents(&channel_members(), &messages(), &opts(10))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, JobError::Schema { table, .. } if table == "group_messages"),
        "got {err}"
    );
}

#[tokio::test]
async fn test_wrong_parent_is_rejected() {
    let store = store_with_members().await;
    let mut job = BackfillJob::new(&store);
    let tags = im_core::TargetTable::new(ident("tags"), ident("id"), ident("public_id"));
    let err = job
        .resolve_dependents(&channel_members(), &tags, &opts(10))
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::InvalidOptions(_)));
}

#[tokio::test]
async fn test_concurrent_cursor_write_is_skipped() {
    let store = store_with_members().await;
    let mut job = BackfillJob::new(&store);
    job.run(&messages(), &opts(10)).await.unwrap();

    // Another writer sets member 10's cursor between select and update
    let theirs = "0190a3b4-0000-7000-8000-0000000000bb";
    *store.interfere.lock().unwrap() = Some(format!(
        "UPDATE channel_members SET last_seen_public_id = '{theirs}' WHERE id = 10"
    ));

    let summary = job
        .resolve_dependents(&channel_members(), &messages(), &opts(10))
        .await
        .unwrap();
    assert_eq!(summary.rows_updated, 1);
    assert_eq!(summary.rows_skipped, 1);
    assert_eq!(summary.orphaned, 1);

    let cursors = cursors(&store);
    assert_eq!(cursors[0].1.as_deref(), Some(theirs));
    assert_eq!(cursors[1].1, public_id(&store, 3));
}

#[derive(Default)]
struct Finishes(std::cell::Cell<usize>);

impl ProgressObserver for Finishes {
    fn on_batch(&self, _progress: &BatchProgress<'_>) {}

    fn on_finish(&self, _table: &str) {
        self.0.set(self.0.get() + 1);
    }
}

#[tokio::test]
async fn test_failed_cursor_batch_still_finishes_progress() {
    let mut store = store_with_members().await;
    // Batch 1 is the primary pass, batch 2 the first cursor batch
    store.fail_on_batch = Some(2);
    let finishes = Finishes::default();
    let mut job = BackfillJob::new(&store).with_observer(&finishes);
    job.run(&messages(), &opts(10)).await.unwrap();
    assert_eq!(finishes.0.get(), 1);

    let err = job
        .resolve_dependents(&channel_members(), &messages(), &opts(10))
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::BatchWrite { batch: 1, .. }), "got {err}");
    assert_eq!(finishes.0.get(), 2);
}

