//! Query engine
//!
//! Binds the storage engine (data source) to the query operations and
//! builder (data transforms) behind one surface. An engine handle is scoped
//! to a single user and database; external layers issue every call through
//! it and never touch the storage engine or filesystem directly.
//!
//! Typed errors from below propagate unchanged; nothing is swallowed or
//! retried here.

use crate::error::{Error, Result};
use crate::ops::{self, Aggregation, FieldFilter, FilterOp, GroupRow, JoinType, SortKey};
use crate::query::QueryBuilder;
use crate::storage::StorageEngine;
use crate::types::{generate_record_id, Document, Record, TableMeta, Value};
use std::sync::Arc;
use tracing::info;

/// Public query surface over one user's database
///
/// Cheap to clone; clones share the same storage engine and lock manager.
#[derive(Clone)]
pub struct QueryEngine {
    storage: Arc<StorageEngine>,
    user: String,
    database: String,
}

impl QueryEngine {
    /// Bind to a user and database, creating either when missing
    pub fn open(storage: Arc<StorageEngine>, user: &str, database: &str) -> Result<Self> {
        if !storage.user_exists(user)? {
            match storage.create_user(user) {
                Err(Error::AlreadyExists(_)) => {}
                other => other?,
            }
        }
        if !storage.database_exists(user, database)? {
            match storage.create_database(user, database, Document::new()) {
                Err(Error::AlreadyExists(_)) => {}
                other => other?,
            }
        }
        info!("opened database {}/{}", user, database);
        Ok(QueryEngine {
            storage,
            user: user.to_string(),
            database: database.to_string(),
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    // ---- table administration ----

    pub fn create_table(&self, meta: TableMeta) -> Result<()> {
        self.storage.create_table(&self.user, &self.database, meta)
    }

    pub fn delete_table(&self, table: &str) -> Result<()> {
        self.storage.delete_table(&self.user, &self.database, table)
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        self.storage.table_exists(&self.user, &self.database, table)
    }

    pub fn list_tables(&self) -> Result<Vec<String>> {
        self.storage.list_tables(&self.user, &self.database)
    }

    // ---- record CRUD ----

    /// Insert a record, failing with `AlreadyExists` on a duplicate id
    ///
    /// Generates an id when none is given and creates the table on first
    /// use. The duplicate check runs under the table's write lock.
    pub fn insert(&self, table: &str, id: Option<String>, data: Document) -> Result<Record> {
        let record = Record::new(id.unwrap_or_else(generate_record_id), data);
        if !self.table_exists(table)? {
            // A racing creator may win; the insert below proceeds either way.
            if let Err(err) = self.create_table(TableMeta::new(table)) {
                if !matches!(err, Error::AlreadyExists(_)) {
                    return Err(err);
                }
            }
        }
        self.storage
            .insert_record(&self.user, &self.database, table, &record)?;
        Ok(record)
    }

    pub fn find_by_id(&self, table: &str, id: &str) -> Result<Record> {
        self.storage
            .load_record(&self.user, &self.database, table, id)
    }

    /// Every record in the table: empty vec for an empty table, `NotFound`
    /// for a missing one
    pub fn find_all(&self, table: &str) -> Result<Vec<Record>> {
        self.storage
            .load_all_records(&self.user, &self.database, table)
    }

    /// Replace a record's payload, failing with `NotFound` when absent
    pub fn update(&self, table: &str, id: &str, data: Document) -> Result<Record> {
        let record = Record::new(id, data);
        self.storage
            .update_record(&self.user, &self.database, table, &record)?;
        Ok(record)
    }

    pub fn delete(&self, table: &str, id: &str) -> Result<()> {
        self.storage
            .delete_record(&self.user, &self.database, table, id)
    }

    // ---- queries ----

    /// Chainable cursor seeded with a snapshot of the table
    pub fn table(&self, table: &str) -> Result<QueryBuilder> {
        Ok(QueryBuilder::new(self.find_all(table)?))
    }

    /// One-shot field filter
    pub fn filter(
        &self,
        table: &str,
        field: &str,
        value: impl Into<Value>,
        op: FilterOp,
    ) -> Result<Vec<Record>> {
        let records = self.find_all(table)?;
        Ok(ops::filter(&records, &FieldFilter::new(field, op, value)))
    }

    /// One-shot projection
    pub fn project<S: AsRef<str>>(&self, table: &str, fields: &[S]) -> Result<Vec<Document>> {
        let records = self.find_all(table)?;
        Ok(ops::project(&records, fields))
    }

    /// One-shot projection with an optional filter condition
    pub fn select<S: AsRef<str>>(
        &self,
        table: &str,
        fields: &[S],
        condition: Option<&FieldFilter>,
    ) -> Result<Vec<Document>> {
        let mut records = self.find_all(table)?;
        if let Some(condition) = condition {
            records = ops::filter(&records, condition);
        }
        Ok(ops::project(&records, fields))
    }

    /// One-shot stable multi-key sort
    pub fn sort(&self, table: &str, keys: &[SortKey]) -> Result<Vec<Record>> {
        let records = self.find_all(table)?;
        Ok(ops::sort(&records, keys))
    }

    /// One-shot group-and-aggregate
    pub fn group_by(
        &self,
        table: &str,
        field: &str,
        aggregations: &[Aggregation],
    ) -> Result<Vec<GroupRow>> {
        let records = self.find_all(table)?;
        Ok(ops::group_and_aggregate(&records, field, aggregations))
    }

    /// Equality join of two tables into merged documents
    pub fn join(
        &self,
        left_table: &str,
        right_table: &str,
        left_field: &str,
        right_field: &str,
        join_type: JoinType,
    ) -> Result<Vec<Document>> {
        let left = self.find_all(left_table)?;
        let right = self.find_all(right_table)?;
        Ok(ops::join(&left, &right, left_field, right_field, join_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LockManager;
    use tempfile::TempDir;

    fn setup() -> (TempDir, QueryEngine) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(StorageEngine::new(
            temp_dir.path(),
            Arc::new(LockManager::new()),
        ));
        let engine = QueryEngine::open(storage, "alice", "shop").unwrap();
        (temp_dir, engine)
    }

    fn doc(pairs: &[(&str, Value)]) -> Document {
        let mut data = Document::new();
        for (k, v) in pairs {
            data.insert(k.to_string(), v.clone());
        }
        data
    }

    #[test]
    fn test_open_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(StorageEngine::new(
            temp_dir.path(),
            Arc::new(LockManager::new()),
        ));
        QueryEngine::open(Arc::clone(&storage), "alice", "shop").unwrap();
        QueryEngine::open(storage, "alice", "shop").unwrap();
    }

    #[test]
    fn test_insert_generates_id_when_missing() {
        let (_tmp, engine) = setup();
        let record = engine
            .insert("products", None, doc(&[("price", 10.into())]))
            .unwrap();
        assert_eq!(record.id.len(), 32);
        assert_eq!(engine.find_by_id("products", &record.id).unwrap(), record);
    }

    #[test]
    fn test_insert_duplicate_id_fails() {
        let (_tmp, engine) = setup();
        engine
            .insert("products", Some("p1".into()), doc(&[("price", 10.into())]))
            .unwrap();
        assert!(matches!(
            engine.insert("products", Some("p1".into()), Document::new()),
            Err(Error::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_update_requires_existing_record() {
        let (_tmp, engine) = setup();
        engine
            .insert("products", Some("p1".into()), doc(&[("price", 10.into())]))
            .unwrap();

        assert!(matches!(
            engine.update("products", "p2", Document::new()),
            Err(Error::NotFound(_))
        ));

        engine
            .update("products", "p1", doc(&[("price", 20.into())]))
            .unwrap();
        let loaded = engine.find_by_id("products", "p1").unwrap();
        assert_eq!(loaded.data["price"], Value::Int(20));
    }

    #[test]
    fn test_find_all_missing_table_is_not_found() {
        let (_tmp, engine) = setup();
        assert!(matches!(
            engine.find_all("nope"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(engine.table("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_one_shot_filter() {
        let (_tmp, engine) = setup();
        for (id, price) in [("a", 50), ("b", 100), ("c", 150)] {
            engine
                .insert("products", Some(id.into()), doc(&[("price", price.into())]))
                .unwrap();
        }
        let out = engine
            .filter("products", "price", 100i64, FilterOp::Gt)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data["price"], Value::Int(150));
    }

    #[test]
    fn test_one_shot_group_by_and_join() {
        let (_tmp, engine) = setup();
        for (id, cat, price) in [("1", "a", 10), ("2", "a", 30), ("3", "b", 5)] {
            engine
                .insert(
                    "sales",
                    Some(id.into()),
                    doc(&[("cat", cat.into()), ("price", price.into())]),
                )
                .unwrap();
        }
        let rows = engine
            .group_by("sales", "cat", &[Aggregation::new(ops::AggregateOp::Sum, "price")])
            .unwrap();
        assert_eq!(rows[0].summary["sum_price"], Value::Int(40));
        assert_eq!(rows[1].summary["sum_price"], Value::Int(5));

        engine
            .insert(
                "cats",
                Some("a".into()),
                doc(&[("cat", "a".into()), ("label", "Alpha".into())]),
            )
            .unwrap();
        let joined = engine
            .join("sales", "cats", "cat", "cat", JoinType::Left)
            .unwrap();
        assert_eq!(joined.len(), 3);
        let labeled = joined
            .iter()
            .filter(|d| d.contains_key("label"))
            .count();
        assert_eq!(labeled, 2);
    }

    #[test]
    fn test_table_admin_surface() {
        let (_tmp, engine) = setup();
        engine.create_table(TableMeta::new("products")).unwrap();
        assert!(engine.table_exists("products").unwrap());
        assert!(matches!(
            engine.create_table(TableMeta::new("products")),
            Err(Error::AlreadyExists(_))
        ));
        assert_eq!(engine.list_tables().unwrap(), vec!["products"]);

        engine.delete_table("products").unwrap();
        assert!(!engine.table_exists("products").unwrap());
        assert!(engine.list_tables().unwrap().is_empty());
    }
}
