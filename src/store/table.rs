//! CSV-backed table with backup-before-mutate.
//!
//! Every mutation runs `acquire gate -> snapshot -> load -> mutate -> persist`
//! and releases the gate when the guard drops. A failure after the snapshot
//! leaves the backup refreshed and the live file untouched.
//!
//! `list` does not take the gate. Persisting rewrites the live file in place,
//! so a concurrent `list` can observe a half-written table and fail to parse;
//! callers treat that as transient.

use crate::store::{
    error::StoreError,
    gate::Gate,
    record::{RecordPatch, TableRecord, TABLE_COLUMNS},
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

pub struct TableStore {
    table_path: PathBuf,
    backup_path: PathBuf,
    gate: Gate,
}

impl TableStore {
    pub fn new(table_path: impl Into<PathBuf>, backup_path: impl Into<PathBuf>, gate: Gate) -> Self {
        Self {
            table_path: table_path.into(),
            backup_path: backup_path.into(),
            gate,
        }
    }

    pub fn table_path(&self) -> &Path {
        &self.table_path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Create a header-only table if none exists. Returns true if one was created.
    pub async fn ensure_initialized(&self) -> Result<bool, StoreError> {
        let exists = fs::try_exists(&self.table_path)
            .await
            .map_err(StoreError::io(&self.table_path))?;
        if exists {
            return Ok(false);
        }

        let _guard = self.gate.acquire("init").await;
        self.persist(&[]).await?;
        info!("📄 Created empty table at {}", self.table_path.display());
        Ok(true)
    }

    pub async fn has_backup(&self) -> Result<bool, StoreError> {
        fs::try_exists(&self.backup_path)
            .await
            .map_err(StoreError::io(&self.backup_path))
    }

    pub async fn list(&self) -> Result<Vec<TableRecord>, StoreError> {
        self.load().await
    }

    /// Append `record`. Duplicate `user` values are allowed.
    pub async fn create(&self, record: TableRecord) -> Result<(), StoreError> {
        let _guard = self.gate.acquire("create").await;
        self.snapshot().await?;

        let mut records = self.load().await?;
        records.push(record);
        self.persist(&records).await?;

        debug!(rows = records.len(), "Record appended");
        Ok(())
    }

    /// Apply `patch` to every row whose `user` equals `user_id`. Returns rows touched.
    pub async fn update(&self, user_id: &str, patch: &RecordPatch) -> Result<usize, StoreError> {
        let _guard = self.gate.acquire("update").await;
        self.snapshot().await?;

        let mut records = self.load().await?;
        let mut matched = 0;
        for record in records.iter_mut().filter(|r| r.user == user_id) {
            patch.apply(record);
            matched += 1;
        }
        if matched == 0 {
            return Err(StoreError::NotFound);
        }

        self.persist(&records).await?;
        debug!(user_id, matched, "Records updated");
        Ok(matched)
    }

    /// Drop every row whose `user` equals `user_id`. Returns rows removed.
    pub async fn delete(&self, user_id: &str) -> Result<usize, StoreError> {
        let _guard = self.gate.acquire("delete").await;
        self.snapshot().await?;

        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|r| r.user != user_id);
        let removed = before - records.len();
        if removed == 0 {
            return Err(StoreError::NotFound);
        }

        self.persist(&records).await?;
        debug!(user_id, removed, "Records deleted");
        Ok(removed)
    }

    /// Copy the backup over the live table. Does not snapshot first.
    pub async fn restore(&self) -> Result<(), StoreError> {
        if !self.has_backup().await? {
            return Err(StoreError::NoBackup);
        }

        let _guard = self.gate.acquire("restore").await;
        fs::copy(&self.backup_path, &self.table_path)
            .await
            .map_err(StoreError::copy(&self.backup_path, &self.table_path))?;

        info!("♻️ Table restored from {}", self.backup_path.display());
        Ok(())
    }

    async fn snapshot(&self) -> Result<(), StoreError> {
        fs::copy(&self.table_path, &self.backup_path)
            .await
            .map_err(StoreError::copy(&self.table_path, &self.backup_path))?;
        Ok(())
    }

    async fn load(&self) -> Result<Vec<TableRecord>, StoreError> {
        let bytes = fs::read(&self.table_path)
            .await
            .map_err(StoreError::io(&self.table_path))?;
        parse_table(&bytes)
    }

    async fn persist(&self, records: &[TableRecord]) -> Result<(), StoreError> {
        let bytes = render_table(records)?;
        fs::write(&self.table_path, bytes)
            .await
            .map_err(StoreError::io(&self.table_path))
    }
}

/// Parse a CSV table. A missing column (including an empty file) is an error.
pub fn parse_table(bytes: &[u8]) -> Result<Vec<TableRecord>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader.headers()?;
    if let Some(missing) = TABLE_COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(StoreError::Malformed(format!("missing column '{missing}'")));
    }

    reader
        .deserialize()
        .collect::<Result<Vec<TableRecord>, _>>()
        .map_err(StoreError::from)
}

/// Render records as CSV, header row always included.
pub fn render_table(records: &[TableRecord]) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(TABLE_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }

    writer
        .into_inner()
        .map_err(|e| StoreError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};
    use tempfile::TempDir;

    fn record(user: &str, pnl: f64) -> TableRecord {
        TableRecord {
            user: user.to_string(),
            broker: "kraken".to_string(),
            api_key: format!("{user}-key"),
            api_secret: format!("{user}-secret"),
            pnl,
            margin: 1000.0,
            max_risk: 0.05,
        }
    }

    async fn create_test_store() -> (TableStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(
            dir.path().join("table.csv"),
            dir.path().join("table.backup.csv"),
            Gate::default(),
        );
        store.ensure_initialized().await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_fresh_table_is_empty_with_header() {
        let (store, _dir) = create_test_store().await;

        assert!(store.list().await.unwrap().is_empty());
        let text = std::fs::read_to_string(store.table_path()).unwrap();
        assert_eq!(text.trim_end(), "user,broker,API_key,API_secret,pnl,margin,max_risk");
        assert!(!store.has_backup().await.unwrap());
    }

    #[tokio::test]
    async fn test_initialize_keeps_existing_table() {
        let (store, _dir) = create_test_store().await;
        store.create(record("a", 1.0)).await.unwrap();

        assert!(!store.ensure_initialized().await.unwrap());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let (store, _dir) = create_test_store().await;
        let created = record("alice", -12.75);

        store.create(created.clone()).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_create_allows_duplicate_users() {
        let (store, _dir) = create_test_store().await;

        store.create(record("alice", 1.0)).await.unwrap();
        store.create(record("alice", 2.0)).await.unwrap();

        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_changes_only_present_fields() {
        let (store, _dir) = create_test_store().await;
        store.create(record("alice", 1.0)).await.unwrap();
        store.create(record("bob", 2.0)).await.unwrap();

        let patch = RecordPatch {
            pnl: Some(99.5),
            broker: Some("binance".to_string()),
            ..Default::default()
        };
        assert_eq!(store.update("alice", &patch).await.unwrap(), 1);

        let rows = store.list().await.unwrap();
        let mut expected = record("alice", 99.5);
        expected.broker = "binance".to_string();
        assert_eq!(rows[0], expected);
        assert_eq!(rows[1], record("bob", 2.0));
    }

    #[tokio::test]
    async fn test_update_hits_every_duplicate() {
        let (store, _dir) = create_test_store().await;
        store.create(record("alice", 1.0)).await.unwrap();
        store.create(record("bob", 2.0)).await.unwrap();
        store.create(record("alice", 3.0)).await.unwrap();

        let patch = RecordPatch {
            margin: Some(5.0),
            ..Default::default()
        };
        assert_eq!(store.update("alice", &patch).await.unwrap(), 2);

        let rows = store.list().await.unwrap();
        assert_eq!(rows[0].margin, 5.0);
        assert_eq!(rows[1].margin, 1000.0);
        assert_eq!(rows[2].margin, 5.0);
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let (store, _dir) = create_test_store().await;
        store.create(record("alice", 1.0)).await.unwrap();
        let before = std::fs::read(store.table_path()).unwrap();

        let result = store.update("nobody", &RecordPatch::default()).await;

        assert!(matches!(result, Err(StoreError::NotFound)));
        assert_eq!(std::fs::read(store.table_path()).unwrap(), before);
        // The snapshot was taken before the lookup failed.
        assert_eq!(std::fs::read(store.backup_path()).unwrap(), before);
        assert!(!store.gate().is_held());
    }

    #[tokio::test]
    async fn test_delete_removes_all_matches_then_not_found() {
        let (store, _dir) = create_test_store().await;
        store.create(record("alice", 1.0)).await.unwrap();
        store.create(record("bob", 2.0)).await.unwrap();
        store.create(record("alice", 3.0)).await.unwrap();

        assert_eq!(store.delete("alice").await.unwrap(), 2);
        assert_eq!(store.list().await.unwrap(), vec![record("bob", 2.0)]);

        assert!(matches!(
            store.delete("alice").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_restore_without_backup_is_not_found() {
        let (store, _dir) = create_test_store().await;

        let result = store.restore().await;

        assert!(matches!(result, Err(StoreError::NoBackup)));
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_delete_restore_walkthrough() {
        let (store, _dir) = create_test_store().await;
        store.create(record("a", 1.0)).await.unwrap();

        store.create(record("b", 2.0)).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);

        store.delete("a").await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec![record("b", 2.0)]);

        store.restore().await.unwrap();
        assert_eq!(
            store.list().await.unwrap(),
            vec![record("a", 1.0), record("b", 2.0)]
        );
    }

    #[tokio::test]
    async fn test_restore_reverts_update_exactly() {
        let (store, _dir) = create_test_store().await;
        store.create(record("alice", 1.0)).await.unwrap();
        let before = std::fs::read(store.table_path()).unwrap();

        let patch = RecordPatch {
            pnl: Some(-50.0),
            ..Default::default()
        };
        store.update("alice", &patch).await.unwrap();
        store.restore().await.unwrap();

        assert_eq!(std::fs::read(store.table_path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_restore_does_not_snapshot() {
        let (store, _dir) = create_test_store().await;
        store.create(record("a", 1.0)).await.unwrap();
        store.create(record("b", 2.0)).await.unwrap();

        store.restore().await.unwrap();
        store.restore().await.unwrap();

        // Backup still holds the pre-"b" state; a second restore cannot undo the first.
        assert_eq!(store.list().await.unwrap(), vec![record("a", 1.0)]);
    }

    #[tokio::test]
    async fn test_malformed_table_is_an_error_not_empty() {
        let (store, _dir) = create_test_store().await;
        std::fs::write(store.table_path(), "user,broker\nalice,kraken\n").unwrap();

        assert!(matches!(
            store.list().await,
            Err(StoreError::Malformed(_))
        ));
        assert!(store.create(record("bob", 1.0)).await.is_err());
        assert!(!store.gate().is_held());
    }

    #[tokio::test]
    async fn test_unparseable_value_is_an_error() {
        let (store, _dir) = create_test_store().await;
        std::fs::write(
            store.table_path(),
            "user,broker,API_key,API_secret,pnl,margin,max_risk\nalice,kraken,k,s,lots,1,1\n",
        )
        .unwrap();

        assert!(matches!(store.list().await, Err(StoreError::Csv(_))));
    }

    #[test]
    fn test_empty_file_is_malformed() {
        assert!(matches!(parse_table(b""), Err(StoreError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_missing_table_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(
            dir.path().join("absent.csv"),
            dir.path().join("absent.backup.csv"),
            Gate::default(),
        );

        assert!(matches!(store.list().await, Err(StoreError::Io { .. })));
        assert!(matches!(
            store.create(record("a", 1.0)).await,
            Err(StoreError::Copy { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_does_not_wait_for_the_gate() {
        let (store, _dir) = create_test_store().await;
        store.create(record("alice", 1.0)).await.unwrap();

        let _held = store.gate().acquire("test").await;
        let rows = tokio::time::timeout(Duration::from_millis(200), store.list())
            .await
            .expect("list blocked on a held gate")
            .unwrap();

        assert_eq!(rows, vec![record("alice", 1.0)]);
    }

    #[tokio::test]
    async fn test_failed_snapshot_names_both_files() {
        let (store, _dir) = create_test_store().await;
        std::fs::create_dir(store.backup_path()).unwrap();

        let err = store.create(record("alice", 1.0)).await.unwrap_err();

        let message = err.to_string();
        assert!(matches!(err, StoreError::Copy { .. }));
        assert!(message.contains(&store.table_path().display().to_string()));
        assert!(message.contains(&store.backup_path().display().to_string()));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_restore_names_the_live_table() {
        let (store, _dir) = create_test_store().await;
        store.create(record("alice", 1.0)).await.unwrap();
        std::fs::remove_file(store.table_path()).unwrap();
        std::fs::create_dir(store.table_path()).unwrap();

        let err = store.restore().await.unwrap_err();

        assert!(matches!(
            &err,
            StoreError::Copy { to, .. } if to == store.table_path()
        ));
        assert!(err.to_string().contains(&store.table_path().display().to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_lose_nothing() {
        let (store, _dir) = create_test_store().await;
        let store = Arc::new(store);

        let tasks: Vec<_> = (0..24)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.create(record(&format!("u{i}"), i as f64)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let rows = store.list().await.unwrap();
        assert_eq!(rows.len(), 24);
        for i in 0..24 {
            assert!(rows.iter().any(|r| r.user == format!("u{i}")));
        }
    }
}
