//! Persistent storage engine over plain directories and JSON files
//!
//! Entities form a strict tree on disk:
//!
//! ```text
//! <base>/<user>/<database>/metadata.json
//! <base>/<user>/<database>/<table>/metadata.json
//! <base>/<user>/<database>/<table>/<record_id>.json
//! ```
//!
//! Every operation runs under the matching reader/writer lock: one lock per
//! table covers its records, one lock per database covers its metadata and
//! table creation/deletion. All file writes go through an atomic
//! temp-then-rename replace, so a crash mid-write leaves the previous
//! version intact.

use crate::error::{Error, Result};
use crate::lock::{LockManager, ReadGuard, WriteGuard};
use crate::sanitize::{restore, sanitize};
use crate::types::{DatabaseMeta, Document, Record, TableMeta};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// File name of the per-directory metadata document
const METADATA_FILE: &str = "metadata.json";

/// Storage engine backed by the local filesystem
///
/// The lock manager is injected so callers (and tests) control lock scope.
pub struct StorageEngine {
    base: PathBuf,
    locks: Arc<LockManager>,
    lock_timeout: Option<Duration>,
}

impl StorageEngine {
    /// Create an engine rooted at the given base path
    pub fn new<P: AsRef<Path>>(base: P, locks: Arc<LockManager>) -> Self {
        StorageEngine {
            base: base.as_ref().to_path_buf(),
            locks,
            lock_timeout: None,
        }
    }

    /// Bound every lock acquisition; expiry surfaces [`Error::LockTimeout`]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    // ---- users ----

    pub fn create_user(&self, user: &str) -> Result<()> {
        let key = sanitize(user)?;
        let _guard = self.lock_write(&key)?;
        let dir = self.dir(&key);
        if dir.exists() {
            return Err(Error::AlreadyExists(format!("user {}", user)));
        }
        fs::create_dir_all(&dir)?;
        debug!("created user {}", user);
        Ok(())
    }

    pub fn delete_user(&self, user: &str) -> Result<()> {
        let key = sanitize(user)?;
        let _guard = self.lock_write(&key)?;
        let dir = self.dir(&key);
        if !dir.exists() {
            return Err(Error::NotFound(format!("user {}", user)));
        }
        // Take every database and table lock below before touching the tree,
        // so no record writer is mid-flight during removal.
        let _inner = self.lock_children_for_delete(&key, &dir)?;
        fs::remove_dir_all(&dir)?;
        debug!("deleted user {}", user);
        Ok(())
    }

    pub fn user_exists(&self, user: &str) -> Result<bool> {
        let key = sanitize(user)?;
        let _guard = self.lock_read(&key)?;
        Ok(self.dir(&key).exists())
    }

    pub fn list_users(&self) -> Result<Vec<String>> {
        if !self.base.exists() {
            return Ok(Vec::new());
        }
        Ok(list_dir_names(&self.base)?)
    }

    // ---- databases ----

    pub fn create_database(&self, user: &str, database: &str, settings: Document) -> Result<()> {
        let user_key = sanitize(user)?;
        let key = format!("{}/{}", user_key, sanitize(database)?);
        let _guard = self.lock_write(&key)?;
        if !self.dir(&user_key).exists() {
            return Err(Error::NotFound(format!("user {}", user)));
        }
        let dir = self.dir(&key);
        if dir.exists() {
            return Err(Error::AlreadyExists(format!("database {}", database)));
        }
        fs::create_dir_all(&dir)?;
        let mut meta = DatabaseMeta::new(database);
        meta.settings = settings;
        write_json_atomic(&dir.join(METADATA_FILE), &meta)?;
        debug!("created database {}/{}", user, database);
        Ok(())
    }

    pub fn delete_database(&self, user: &str, database: &str) -> Result<()> {
        let key = self.database_key(user, database)?;
        let _guard = self.lock_write(&key)?;
        let dir = self.dir(&key);
        if !dir.exists() {
            return Err(Error::NotFound(format!("database {}", database)));
        }
        let _tables = self.lock_children_for_delete(&key, &dir)?;
        fs::remove_dir_all(&dir)?;
        debug!("deleted database {}/{}", user, database);
        Ok(())
    }

    pub fn database_exists(&self, user: &str, database: &str) -> Result<bool> {
        let key = self.database_key(user, database)?;
        let _guard = self.lock_read(&key)?;
        Ok(self.dir(&key).exists())
    }

    pub fn list_databases(&self, user: &str) -> Result<Vec<String>> {
        let key = sanitize(user)?;
        let _guard = self.lock_read(&key)?;
        let dir = self.dir(&key);
        if !dir.exists() {
            return Err(Error::NotFound(format!("user {}", user)));
        }
        Ok(list_dir_names(&dir)?)
    }

    /// Read database metadata; reconstructed from the directory listing when
    /// the metadata file is absent
    pub fn database_meta(&self, user: &str, database: &str) -> Result<DatabaseMeta> {
        let key = self.database_key(user, database)?;
        let _guard = self.lock_read(&key)?;
        self.read_database_meta_unlocked(&key, database)
    }

    // ---- tables ----

    pub fn create_table(&self, user: &str, database: &str, meta: TableMeta) -> Result<()> {
        let db_key = self.database_key(user, database)?;
        let table_key = format!("{}/{}", db_key, sanitize(&meta.name)?);
        let _guard = self.lock_write(&db_key)?;
        if !self.dir(&db_key).exists() {
            return Err(Error::NotFound(format!("database {}", database)));
        }
        let dir = self.dir(&table_key);
        if dir.exists() {
            return Err(Error::AlreadyExists(format!("table {}", meta.name)));
        }
        fs::create_dir_all(&dir)?;
        write_json_atomic(&dir.join(METADATA_FILE), &meta)?;

        let mut db_meta = self.read_database_meta_unlocked(&db_key, database)?;
        if !db_meta.tables.contains(&meta.name) {
            db_meta.tables.push(meta.name.clone());
            write_json_atomic(&self.dir(&db_key).join(METADATA_FILE), &db_meta)?;
        }
        debug!("created table {}/{}/{}", user, database, meta.name);
        Ok(())
    }

    pub fn delete_table(&self, user: &str, database: &str, table: &str) -> Result<()> {
        let db_key = self.database_key(user, database)?;
        let table_key = format!("{}/{}", db_key, sanitize(table)?);
        let _db_guard = self.lock_write(&db_key)?;
        let dir = self.dir(&table_key);
        if !dir.exists() {
            return Err(Error::NotFound(format!("table {}", table)));
        }
        let _table_guard = self.lock_write(&table_key)?;
        fs::remove_dir_all(&dir)?;

        let mut db_meta = self.read_database_meta_unlocked(&db_key, database)?;
        db_meta.tables.retain(|t| t != table);
        write_json_atomic(&self.dir(&db_key).join(METADATA_FILE), &db_meta)?;
        debug!("deleted table {}/{}/{}", user, database, table);
        Ok(())
    }

    pub fn table_exists(&self, user: &str, database: &str, table: &str) -> Result<bool> {
        let key = self.table_key(user, database, table)?;
        let _guard = self.lock_read(&key)?;
        Ok(self.dir(&key).exists())
    }

    pub fn list_tables(&self, user: &str, database: &str) -> Result<Vec<String>> {
        let key = self.database_key(user, database)?;
        let _guard = self.lock_read(&key)?;
        if !self.dir(&key).exists() {
            return Err(Error::NotFound(format!("database {}", database)));
        }
        let meta = self.read_database_meta_unlocked(&key, database)?;
        Ok(meta.tables)
    }

    pub fn table_meta(&self, user: &str, database: &str, table: &str) -> Result<TableMeta> {
        let key = self.table_key(user, database, table)?;
        let _guard = self.lock_read(&key)?;
        let dir = self.dir(&key);
        if !dir.exists() {
            return Err(Error::NotFound(format!("table {}", table)));
        }
        let meta_path = dir.join(METADATA_FILE);
        if meta_path.exists() {
            read_json(&meta_path)
        } else {
            Ok(TableMeta::new(table))
        }
    }

    pub fn set_table_meta(&self, user: &str, database: &str, meta: &TableMeta) -> Result<()> {
        let key = self.table_key(user, database, &meta.name)?;
        let _guard = self.lock_write(&key)?;
        let dir = self.dir(&key);
        if !dir.exists() {
            return Err(Error::NotFound(format!("table {}", meta.name)));
        }
        write_json_atomic(&dir.join(METADATA_FILE), meta)
    }

    // ---- records ----

    /// The single write primitive: overwrite the record file in place
    ///
    /// Does not distinguish create from update; callers that need that
    /// distinction use [`StorageEngine::insert_record`] or
    /// [`StorageEngine::update_record`].
    pub fn save_record(
        &self,
        user: &str,
        database: &str,
        table: &str,
        record: &Record,
    ) -> Result<()> {
        let key = self.table_key(user, database, table)?;
        let id_token = sanitize(&record.id)?;
        let _guard = self.lock_write(&key)?;
        self.save_record_unlocked(&key, table, &id_token, record)
    }

    /// Save, failing with `AlreadyExists` when the id is already present
    ///
    /// The existence check and the write happen under one write lock, so two
    /// racing inserts of the same id resolve to exactly one winner.
    pub fn insert_record(
        &self,
        user: &str,
        database: &str,
        table: &str,
        record: &Record,
    ) -> Result<()> {
        let key = self.table_key(user, database, table)?;
        let id_token = sanitize(&record.id)?;
        let _guard = self.lock_write(&key)?;
        if self.record_path(&key, &id_token).exists() {
            return Err(Error::AlreadyExists(format!("record {}", record.id)));
        }
        self.save_record_unlocked(&key, table, &id_token, record)
    }

    /// Save, failing with `NotFound` when the id is absent
    pub fn update_record(
        &self,
        user: &str,
        database: &str,
        table: &str,
        record: &Record,
    ) -> Result<()> {
        let key = self.table_key(user, database, table)?;
        let id_token = sanitize(&record.id)?;
        let _guard = self.lock_write(&key)?;
        if !self.record_path(&key, &id_token).exists() {
            return Err(Error::NotFound(format!("record {}", record.id)));
        }
        self.save_record_unlocked(&key, table, &id_token, record)
    }

    pub fn load_record(&self, user: &str, database: &str, table: &str, id: &str) -> Result<Record> {
        let key = self.table_key(user, database, table)?;
        let id_token = sanitize(id)?;
        let _guard = self.lock_read(&key)?;
        if !self.dir(&key).exists() {
            return Err(Error::NotFound(format!("table {}", table)));
        }
        let path = self.record_path(&key, &id_token);
        if !path.exists() {
            return Err(Error::NotFound(format!("record {}", id)));
        }
        read_json(&path)
    }

    /// Load every record in the table, ordered by record id
    ///
    /// An empty table yields an empty vec; a missing table is `NotFound`.
    pub fn load_all_records(&self, user: &str, database: &str, table: &str) -> Result<Vec<Record>> {
        let key = self.table_key(user, database, table)?;
        let _guard = self.lock_read(&key)?;
        let dir = self.dir(&key);
        if !dir.exists() {
            return Err(Error::NotFound(format!("table {}", table)));
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if is_record_file(&path) {
                records.push(read_json::<Record>(&path)?);
            }
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    pub fn delete_record(&self, user: &str, database: &str, table: &str, id: &str) -> Result<()> {
        let key = self.table_key(user, database, table)?;
        let id_token = sanitize(id)?;
        let _guard = self.lock_write(&key)?;
        let path = self.record_path(&key, &id_token);
        if !path.exists() {
            return Err(Error::NotFound(format!("record {}", id)));
        }
        fs::remove_file(&path)?;
        debug!("deleted record {}/{}/{}/{}", user, database, table, id);
        Ok(())
    }

    pub fn record_exists(&self, user: &str, database: &str, table: &str, id: &str) -> Result<bool> {
        let key = self.table_key(user, database, table)?;
        let id_token = sanitize(id)?;
        let _guard = self.lock_read(&key)?;
        if !self.dir(&key).exists() {
            return Err(Error::NotFound(format!("table {}", table)));
        }
        Ok(self.record_path(&key, &id_token).exists())
    }

    pub fn list_records(&self, user: &str, database: &str, table: &str) -> Result<Vec<String>> {
        let key = self.table_key(user, database, table)?;
        let _guard = self.lock_read(&key)?;
        let dir = self.dir(&key);
        if !dir.exists() {
            return Err(Error::NotFound(format!("table {}", table)));
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if is_record_file(&path) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(restore(stem));
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    // ---- internals ----

    fn database_key(&self, user: &str, database: &str) -> Result<String> {
        Ok(format!("{}/{}", sanitize(user)?, sanitize(database)?))
    }

    fn table_key(&self, user: &str, database: &str, table: &str) -> Result<String> {
        Ok(format!(
            "{}/{}/{}",
            sanitize(user)?,
            sanitize(database)?,
            sanitize(table)?
        ))
    }

    fn dir(&self, key: &str) -> PathBuf {
        let mut path = self.base.clone();
        for segment in key.split('/') {
            path.push(segment);
        }
        path
    }

    fn record_path(&self, table_key: &str, id_token: &str) -> PathBuf {
        self.dir(table_key).join(format!("{}.json", id_token))
    }

    fn lock_read(&self, resource: &str) -> Result<ReadGuard> {
        match self.lock_timeout {
            None => Ok(self.locks.read(resource)),
            Some(timeout) => self.locks.read_timeout(resource, timeout),
        }
    }

    fn lock_write(&self, resource: &str) -> Result<WriteGuard> {
        match self.lock_timeout {
            None => Ok(self.locks.write(resource)),
            Some(timeout) => self.locks.write_timeout(resource, timeout),
        }
    }

    fn save_record_unlocked(
        &self,
        table_key: &str,
        table: &str,
        id_token: &str,
        record: &Record,
    ) -> Result<()> {
        if !self.dir(table_key).exists() {
            return Err(Error::NotFound(format!("table {}", table)));
        }
        write_json_atomic(&self.record_path(table_key, id_token), record)?;
        debug!("saved record {} in {}", record.id, table_key);
        Ok(())
    }

    fn read_database_meta_unlocked(&self, db_key: &str, database: &str) -> Result<DatabaseMeta> {
        let dir = self.dir(db_key);
        if !dir.exists() {
            return Err(Error::NotFound(format!("database {}", database)));
        }
        let meta_path = dir.join(METADATA_FILE);
        if meta_path.exists() {
            read_json(&meta_path)
        } else {
            let mut meta = DatabaseMeta::new(database);
            meta.tables = list_dir_names(&dir)?;
            Ok(meta)
        }
    }

    /// Write-lock every directory one and two levels below `key` so a
    /// subtree removal cannot race in-flight writers
    fn lock_children_for_delete(&self, key: &str, dir: &Path) -> Result<Vec<WriteGuard>> {
        let mut guards = Vec::new();
        for child in list_dir_tokens(dir)? {
            let child_key = format!("{}/{}", key, child);
            let child_dir = self.dir(&child_key);
            guards.push(self.lock_write(&child_key)?);
            for grandchild in list_dir_tokens(&child_dir)? {
                guards.push(self.lock_write(&format!("{}/{}", child_key, grandchild))?);
            }
        }
        Ok(guards)
    }
}

// File helpers

/// Serialize to a sibling temp file, then rename into place
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    let tmp = tmp_path(path);
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn is_record_file(path: &Path) -> bool {
    path.is_file()
        && path.extension().map_or(false, |e| e == "json")
        && path.file_name().map_or(false, |n| n != METADATA_FILE)
}

/// Restored (original) names of subdirectories, sorted
fn list_dir_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names: Vec<String> = list_dir_tokens(dir)?.iter().map(|t| restore(t)).collect();
    names.sort();
    Ok(names)
}

/// On-disk tokens of subdirectories, unsorted
fn list_dir_tokens(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut tokens = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            if let Ok(name) = entry.file_name().into_string() {
                tokens.push(name);
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Document, Value};
    use tempfile::TempDir;

    fn setup() -> (TempDir, StorageEngine) {
        let temp_dir = TempDir::new().unwrap();
        let engine = StorageEngine::new(temp_dir.path(), Arc::new(LockManager::new()));
        (temp_dir, engine)
    }

    fn setup_table(engine: &StorageEngine) {
        engine.create_user("alice").unwrap();
        engine
            .create_database("alice", "shop", Document::new())
            .unwrap();
        engine
            .create_table("alice", "shop", TableMeta::new("products"))
            .unwrap();
    }

    fn record(id: &str, price: i64) -> Record {
        let mut data = Document::new();
        data.insert("price".to_string(), Value::Int(price));
        Record::new(id, data)
    }

    #[test]
    fn test_create_existing_user_fails() {
        let (_tmp, engine) = setup();
        engine.create_user("alice").unwrap();
        assert!(matches!(
            engine.create_user("alice"),
            Err(Error::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_record_roundtrip() {
        let (_tmp, engine) = setup();
        setup_table(&engine);

        let rec = record("p1", 100);
        engine.save_record("alice", "shop", "products", &rec).unwrap();

        let loaded = engine.load_record("alice", "shop", "products", "p1").unwrap();
        assert_eq!(loaded, rec);
    }

    #[test]
    fn test_empty_table_vs_missing_table() {
        let (_tmp, engine) = setup();
        setup_table(&engine);

        let records = engine.load_all_records("alice", "shop", "products").unwrap();
        assert!(records.is_empty());

        assert!(matches!(
            engine.load_all_records("alice", "shop", "missing"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_insert_checks_existence_update_requires_it() {
        let (_tmp, engine) = setup();
        setup_table(&engine);

        let rec = record("p1", 100);
        engine.insert_record("alice", "shop", "products", &rec).unwrap();
        assert!(matches!(
            engine.insert_record("alice", "shop", "products", &rec),
            Err(Error::AlreadyExists(_))
        ));

        let missing = record("p2", 50);
        assert!(matches!(
            engine.update_record("alice", "shop", "products", &missing),
            Err(Error::NotFound(_))
        ));

        let changed = record("p1", 150);
        engine.update_record("alice", "shop", "products", &changed).unwrap();
        let loaded = engine.load_record("alice", "shop", "products", "p1").unwrap();
        assert_eq!(loaded.data["price"], Value::Int(150));
    }

    #[test]
    fn test_delete_record_then_not_found() {
        let (_tmp, engine) = setup();
        setup_table(&engine);

        engine
            .save_record("alice", "shop", "products", &record("p1", 100))
            .unwrap();
        engine.delete_record("alice", "shop", "products", "p1").unwrap();

        assert!(matches!(
            engine.load_record("alice", "shop", "products", "p1"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            engine.delete_record("alice", "shop", "products", "p1"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_metadata_tracks_table_set() {
        let (_tmp, engine) = setup();
        setup_table(&engine);
        engine
            .create_table("alice", "shop", TableMeta::new("orders"))
            .unwrap();

        let meta = engine.database_meta("alice", "shop").unwrap();
        assert_eq!(meta.tables, vec!["products", "orders"]);

        engine.delete_table("alice", "shop", "products").unwrap();
        let meta = engine.database_meta("alice", "shop").unwrap();
        assert_eq!(meta.tables, vec!["orders"]);
        assert!(!engine.table_exists("alice", "shop", "products").unwrap());
    }

    #[test]
    fn test_table_meta_roundtrip() {
        let (_tmp, engine) = setup();
        setup_table(&engine);

        let mut meta = TableMeta::new("products");
        meta.keys = vec!["sku".to_string()];
        meta.indexes
            .insert("by_price".to_string(), vec!["price".to_string()]);
        engine.set_table_meta("alice", "shop", &meta).unwrap();

        let loaded = engine.table_meta("alice", "shop", "products").unwrap();
        assert_eq!(loaded.keys, vec!["sku"]);
        assert_eq!(loaded.indexes["by_price"], vec!["price"]);
    }

    #[test]
    fn test_load_all_is_ordered_by_id() {
        let (_tmp, engine) = setup();
        setup_table(&engine);

        for id in ["c", "a", "b"] {
            engine
                .save_record("alice", "shop", "products", &record(id, 1))
                .unwrap();
        }
        let ids: Vec<String> = engine
            .load_all_records("alice", "shop", "products")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_traversal_identifier_creates_nothing() {
        let (tmp, engine) = setup();
        engine.create_user("alice").unwrap();
        engine
            .create_database("alice", "shop", Document::new())
            .unwrap();

        assert!(matches!(
            engine.create_table("alice", "shop", TableMeta::new("../../etc")),
            Err(Error::InvalidIdentifier(_))
        ));
        assert!(matches!(
            engine.save_record("alice", "shop", "t", &record("../../passwd", 1)),
            Err(Error::InvalidIdentifier(_))
        ));

        // Nothing appeared outside the base directory's entity tree.
        let entries = list_dir_names(tmp.path()).unwrap();
        assert_eq!(entries, vec!["alice"]);
    }

    #[test]
    fn test_colliding_names_stay_distinct_on_disk() {
        let (_tmp, engine) = setup();
        engine.create_user("alice").unwrap();
        engine
            .create_database("alice", "shop", Document::new())
            .unwrap();

        engine
            .create_table("alice", "shop", TableMeta::new("a.b"))
            .unwrap();
        engine
            .create_table("alice", "shop", TableMeta::new("a_b"))
            .unwrap();

        let mut tables = engine.list_tables("alice", "shop").unwrap();
        tables.sort();
        assert_eq!(tables, vec!["a.b", "a_b"]);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let (_tmp, engine) = setup();
        setup_table(&engine);
        engine
            .save_record("alice", "shop", "products", &record("p1", 100))
            .unwrap();

        let table_dir = engine.dir("alice/shop/products");
        for entry in fs::read_dir(table_dir).unwrap() {
            let name = entry.unwrap().file_name();
            assert!(!name.to_string_lossy().ends_with(".tmp"));
        }
    }

    #[test]
    fn test_delete_database_cascades() {
        let (_tmp, engine) = setup();
        setup_table(&engine);
        engine
            .save_record("alice", "shop", "products", &record("p1", 100))
            .unwrap();

        engine.delete_database("alice", "shop").unwrap();
        assert!(!engine.database_exists("alice", "shop").unwrap());
        assert!(matches!(
            engine.load_all_records("alice", "shop", "products"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_lock_timeout_surfaces() {
        let tmp = TempDir::new().unwrap();
        let locks = Arc::new(LockManager::new());
        let engine = StorageEngine::new(tmp.path(), Arc::clone(&locks))
            .with_lock_timeout(Duration::from_millis(20));
        engine.create_user("alice").unwrap();
        engine
            .create_database("alice", "shop", Document::new())
            .unwrap();
        engine
            .create_table("alice", "shop", TableMeta::new("products"))
            .unwrap();

        // Hold the table's write lock externally; the engine's bounded
        // acquisition must expire.
        let _held = locks.write("alice/shop/products");
        assert!(matches!(
            engine.load_all_records("alice", "shop", "products"),
            Err(Error::LockTimeout(_))
        ));
    }
}
