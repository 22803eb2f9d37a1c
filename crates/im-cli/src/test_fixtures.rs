//! On-disk fixtures for command tests

use crate::cli::GlobalArgs;
use im_db::{DuckDbBackend, IdStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CONFIG_YML: &str = "
batch_size: 2
tables:
  - name: group_messages
    created_at: created_at
dependents:
  - name: channel_members
    reference: last_seen_message_id
    cursor: last_seen_public_id
    parent: group_messages
";

const SEED_SQL: &str = "
    CREATE TABLE group_messages (id INTEGER PRIMARY KEY, created_at TIMESTAMP, public_id UUID);
    INSERT INTO group_messages VALUES
        (1, TIMESTAMP '2025-03-01 10:00:00', NULL),
        (2, TIMESTAMP '2025-03-01 09:00:00', NULL),
        (3, TIMESTAMP '2025-03-01 11:00:00', NULL);
    CREATE TABLE channel_members (id INTEGER PRIMARY KEY, last_seen_message_id INTEGER, last_seen_public_id UUID);
    INSERT INTO channel_members VALUES (10, 2, NULL), (11, 99, NULL);";

pub fn db_path(dir: &Path) -> PathBuf {
    dir.join("chat.duckdb")
}

/// A DuckDB file with three pending messages and two member cursors, one
/// of them orphaned, plus a config describing both tables.
pub async fn seeded_globals() -> (TempDir, GlobalArgs) {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(dir.path());
    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        db.execute_batch(SEED_SQL).await.unwrap();
    }
    let config = dir.path().join("idmig.yml");
    std::fs::write(&config, CONFIG_YML).unwrap();

    let global = GlobalArgs {
        database_url: Some(format!("duckdb://{}", path.display())),
        config: Some(config.display().to_string()),
        verbose: false,
        json: false,
    };
    (dir, global)
}

/// Open the fixture database for assertions.
pub fn reopen(dir: &Path) -> DuckDbBackend {
    DuckDbBackend::from_path(&db_path(dir)).unwrap()
}
