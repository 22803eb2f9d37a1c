use super::*;
use crate::cli::BackfillArgs;
use crate::commands::common::{exit_code_for, EXIT_CONNECTION, EXIT_SCHEMA};
use crate::test_fixtures::{reopen, seeded_globals};
use im_db::IdStore;

fn count(dir: &std::path::Path, sql: &str) -> usize {
    let db = reopen(dir);
    db.query_strings(&format!("SELECT CAST(COUNT(*) AS VARCHAR) FROM ({sql})"))
        .unwrap()[0]
        .as_deref()
        .unwrap()
        .parse()
        .unwrap()
}

#[tokio::test]
async fn test_backfill_assigns_and_resolves() {
    let (dir, global) = seeded_globals().await;
    execute(&BackfillArgs::default(), &global).await.unwrap();

    assert_eq!(
        count(dir.path(), "SELECT * FROM group_messages WHERE public_id IS NULL"),
        0
    );
    // Member 10 follows message 2; member 11 points at a missing message
    assert_eq!(
        count(
            dir.path(),
            "SELECT * FROM channel_members c JOIN group_messages m \
             ON m.id = c.last_seen_message_id WHERE c.last_seen_public_id = m.public_id"
        ),
        1
    );
    assert_eq!(
        count(
            dir.path(),
            "SELECT * FROM channel_members WHERE last_seen_public_id IS NULL"
        ),
        1
    );
}

#[tokio::test]
async fn test_backfill_skip_dependents() {
    let (dir, global) = seeded_globals().await;
    let args = BackfillArgs {
        skip_dependents: true,
        ..Default::default()
    };
    execute(&args, &global).await.unwrap();
    assert_eq!(
        count(
            dir.path(),
            "SELECT * FROM channel_members WHERE last_seen_public_id IS NULL"
        ),
        2
    );
}

#[tokio::test]
async fn test_backfill_dry_run_json() {
    let (dir, mut global) = seeded_globals().await;
    global.json = true;
    let args = BackfillArgs {
        dry_run: true,
        ..Default::default()
    };
    execute(&args, &global).await.unwrap();
    assert_eq!(
        count(dir.path(), "SELECT * FROM group_messages WHERE public_id IS NULL"),
        3
    );
}

#[tokio::test]
async fn test_backfill_max_batches() {
    let (dir, global) = seeded_globals().await;
    let args = BackfillArgs {
        batch_size: Some(1),
        max_batches: Some(2),
        skip_dependents: true,
        ..Default::default()
    };
    execute(&args, &global).await.unwrap();
    assert_eq!(
        count(dir.path(), "SELECT * FROM group_messages WHERE public_id IS NULL"),
        1
    );
}

#[tokio::test]
async fn test_unknown_table_is_rejected() {
    let (_dir, global) = seeded_globals().await;
    let args = BackfillArgs {
        table: Some("nope".to_string()),
        ..Default::default()
    };
    assert!(execute(&args, &global).await.is_err());
}

#[tokio::test]
async fn test_missing_column_exits_with_schema_code() {
    let (dir, global) = seeded_globals().await;
    {
        let db = reopen(dir.path());
        db.execute_batch("ALTER TABLE group_messages DROP COLUMN public_id")
            .await
            .unwrap();
    }
    let err = execute(&BackfillArgs::default(), &global)
        .await
        .unwrap_err();
    assert_eq!(exit_code_for(&err), EXIT_SCHEMA);
}

#[tokio::test]
async fn test_missing_database_url_exits_with_connection_code() {
    let (_dir, mut global) = seeded_globals().await;
    global.database_url = None;
    let err = execute(&BackfillArgs::default(), &global)
        .await
        .unwrap_err();
    assert_eq!(exit_code_for(&err), EXIT_CONNECTION);
}

#[tokio::test]
async fn test_zero_batch_size_is_rejected() {
    let (_dir, global) = seeded_globals().await;
    let args = BackfillArgs {
        batch_size: Some(0),
        ..Default::default()
    };
    assert!(execute(&args, &global).await.is_err());
}
