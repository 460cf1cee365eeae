//! Chainable query builder
//!
//! A builder captures one snapshot of a table's records and a list of
//! pending transforms. Every chain method returns a new builder value, so a
//! partially built query can be cloned and branched without any shared
//! mutable state; the snapshot itself sits behind an Arc and is never
//! copied. Nothing runs until a terminal method materializes the result.

use crate::ops::{self, Aggregation, FieldFilter, FilterOp, GroupRow, SortKey};
use crate::types::{Document, Record, Value};
use std::sync::Arc;

#[derive(Clone)]
enum Step {
    Filter(FieldFilter),
    FilterWith(Arc<dyn Fn(&Record) -> bool + Send + Sync>),
    Sort(Vec<SortKey>),
    Limit(usize),
    Skip(usize),
}

/// Deferred query over a captured record snapshot
#[derive(Clone)]
pub struct QueryBuilder {
    source: Arc<Vec<Record>>,
    steps: Vec<Step>,
}

impl QueryBuilder {
    pub fn new(records: Vec<Record>) -> Self {
        QueryBuilder {
            source: Arc::new(records),
            steps: Vec::new(),
        }
    }

    // ---- chainable steps ----

    /// Keep records matching an arbitrary predicate
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.steps.push(Step::FilterWith(Arc::new(predicate)));
        self
    }

    /// Keep records where `field <op> value`
    pub fn filter_by(mut self, field: &str, value: impl Into<Value>, op: FilterOp) -> Self {
        self.steps
            .push(Step::Filter(FieldFilter::new(field, op, value)));
        self
    }

    /// Equality filter, SQL-flavored alias for `filter_by(.., Eq)`
    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter_by(field, value, FilterOp::Eq)
    }

    /// Sort ascending by one field
    pub fn sort(self, field: &str) -> Self {
        self.sort_by(vec![SortKey::asc(field)])
    }

    /// Sort descending by one field
    pub fn sort_desc(self, field: &str) -> Self {
        self.sort_by(vec![SortKey::desc(field)])
    }

    /// Stable multi-key sort
    pub fn sort_by(mut self, keys: Vec<SortKey>) -> Self {
        self.steps.push(Step::Sort(keys));
        self
    }

    /// SQL-flavored alias for `sort`
    pub fn order_by(self, field: &str) -> Self {
        self.sort(field)
    }

    /// Keep at most `count` records of the sequence built so far
    pub fn limit(mut self, count: usize) -> Self {
        self.steps.push(Step::Limit(count));
        self
    }

    /// Drop the first `count` records of the sequence built so far
    pub fn skip(mut self, count: usize) -> Self {
        self.steps.push(Step::Skip(count));
        self
    }

    // ---- terminals ----

    /// Materialize the full result sequence
    pub fn all(&self) -> Vec<Record> {
        self.materialize()
    }

    pub fn first(&self) -> Option<Record> {
        self.materialize().into_iter().next()
    }

    pub fn last(&self) -> Option<Record> {
        self.materialize().pop()
    }

    pub fn count(&self) -> usize {
        self.materialize().len()
    }

    /// Materialize just the payloads
    pub fn documents(&self) -> Vec<Document> {
        self.materialize().into_iter().map(|r| r.data).collect()
    }

    /// Materialize a projection of the named fields
    pub fn select<S: AsRef<str>>(&self, fields: &[S]) -> Vec<Document> {
        ops::project(&self.materialize(), fields)
    }

    /// Group the result and summarize each group
    pub fn group_by(&self, field: &str, aggregations: &[Aggregation]) -> Vec<GroupRow> {
        ops::group_and_aggregate(&self.materialize(), field, aggregations)
    }

    fn materialize(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.source.as_ref().clone();
        for step in &self.steps {
            records = match step {
                Step::Filter(condition) => ops::filter(&records, condition),
                Step::FilterWith(predicate) => ops::filter_with(&records, |r| predicate(r)),
                Step::Sort(keys) => ops::sort(&records, keys),
                Step::Limit(count) => {
                    records.truncate(*count);
                    records
                }
                Step::Skip(count) => records.split_off((*count).min(records.len())),
            };
        }
        records
    }
}
