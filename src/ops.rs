//! Pure query operations
//!
//! Stateless transforms over an ordered sequence of records already loaded
//! into memory. Nothing here touches storage or shared state; every function
//! returns a fresh sequence.

use crate::types::{Document, Record, Value};
use std::cmp::Ordering;

/// Resolve a dot-separated field path against a payload
///
/// `"specs.storage"` descends nested objects; None when any step is absent
/// or a non-object is traversed into.
pub fn lookup_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Comparison operator for field filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Contains,
}

impl FilterOp {
    /// Parse the wire-level operator name used by external callers
    pub fn from_name(name: &str) -> Option<FilterOp> {
        match name {
            "eq" => Some(FilterOp::Eq),
            "ne" => Some(FilterOp::Ne),
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "in" => Some(FilterOp::In),
            "nin" => Some(FilterOp::Nin),
            "contains" => Some(FilterOp::Contains),
            _ => None,
        }
    }
}

/// A (field, operator, value) filter condition
///
/// Missing fields read as Null for Eq/Ne, are excluded by the ordered
/// comparisons, and count as "not in" / "not contains" for the rest.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        FieldFilter {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let field_value = lookup_path(&record.data, &self.field);
        match self.op {
            FilterOp::Eq => field_value.unwrap_or(&Value::Null).loose_eq(&self.value),
            FilterOp::Ne => !field_value.unwrap_or(&Value::Null).loose_eq(&self.value),
            FilterOp::Gt => self.ordered(field_value, |o| o == Ordering::Greater),
            FilterOp::Gte => self.ordered(field_value, |o| o != Ordering::Less),
            FilterOp::Lt => self.ordered(field_value, |o| o == Ordering::Less),
            FilterOp::Lte => self.ordered(field_value, |o| o != Ordering::Greater),
            FilterOp::In => match (field_value, self.value.as_array()) {
                (Some(v), Some(items)) => items.iter().any(|item| item.loose_eq(v)),
                _ => false,
            },
            FilterOp::Nin => match (field_value, self.value.as_array()) {
                (Some(v), Some(items)) => !items.iter().any(|item| item.loose_eq(v)),
                _ => true,
            },
            FilterOp::Contains => match (field_value.and_then(Value::as_str), self.value.as_str())
            {
                (Some(haystack), Some(needle)) => haystack.contains(needle),
                _ => false,
            },
        }
    }

    fn ordered(&self, field_value: Option<&Value>, accept: impl Fn(Ordering) -> bool) -> bool {
        field_value
            .and_then(|v| v.compare(&self.value))
            .map_or(false, accept)
    }
}

/// Keep records matching a field condition
pub fn filter(records: &[Record], condition: &FieldFilter) -> Vec<Record> {
    records
        .iter()
        .filter(|r| condition.matches(r))
        .cloned()
        .collect()
}

/// Keep records matching an arbitrary predicate
pub fn filter_with<F>(records: &[Record], condition: F) -> Vec<Record>
where
    F: Fn(&Record) -> bool,
{
    records.iter().filter(|r| condition(r)).cloned().collect()
}

/// Reduce each record to the named fields (dot-paths supported)
///
/// Fields absent from a record are silently omitted from its projection.
pub fn project<S: AsRef<str>>(records: &[Record], fields: &[S]) -> Vec<Document> {
    records
        .iter()
        .map(|record| {
            let mut out = Document::new();
            for field in fields {
                if let Some(value) = lookup_path(&record.data, field.as_ref()) {
                    set_path(&mut out, field.as_ref(), value.clone());
                }
            }
            out
        })
        .collect()
}

/// One sort criterion: a field path and a direction
#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: String,
    pub ascending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        SortKey {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        SortKey {
            field: field.into(),
            ascending: false,
        }
    }
}

/// Stable multi-key sort
///
/// Records missing a key (or holding Null) sort before records that have
/// it, whatever the direction; the flag only reverses comparisons between
/// present values.
pub fn sort(records: &[Record], keys: &[SortKey]) -> Vec<Record> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        for key in keys {
            let av = lookup_path(&a.data, &key.field).filter(|v| !v.is_null());
            let bv = lookup_path(&b.data, &key.field).filter(|v| !v.is_null());
            let ord = match (av, bv) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => {
                    let cmp = x.compare(y).unwrap_or(Ordering::Equal);
                    if key.ascending {
                        cmp
                    } else {
                        cmp.reverse()
                    }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    sorted
}

/// Slice out `count` records starting at `offset`
pub fn limit(records: &[Record], count: usize, offset: usize) -> Vec<Record> {
    records.iter().skip(offset).take(count).cloned().collect()
}

/// Records sharing one value of the grouping field
#[derive(Debug, Clone)]
pub struct Group {
    pub key: Value,
    pub records: Vec<Record>,
}

/// Partition records by a field value, in first-seen key order
///
/// Records missing the field land in a single Null-keyed group.
pub fn group_by(records: &[Record], field: &str) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for record in records {
        let key = lookup_path(&record.data, field)
            .cloned()
            .unwrap_or(Value::Null);
        match groups.iter_mut().find(|g| g.key.loose_eq(&key)) {
            Some(group) => group.records.push(record.clone()),
            None => groups.push(Group {
                key,
                records: vec![record.clone()],
            }),
        }
    }
    groups
}

/// Aggregation operation over one field within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateOp {
    pub fn from_name(name: &str) -> Option<AggregateOp> {
        match name {
            "count" => Some(AggregateOp::Count),
            "sum" => Some(AggregateOp::Sum),
            "avg" => Some(AggregateOp::Avg),
            "min" => Some(AggregateOp::Min),
            "max" => Some(AggregateOp::Max),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateOp::Count => "count",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
        }
    }
}

/// A requested aggregation: operation plus target field
///
/// `Count` accepts the `*` wildcard field, meaning plain row count.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub op: AggregateOp,
    pub field: String,
}

impl Aggregation {
    pub fn new(op: AggregateOp, field: impl Into<String>) -> Self {
        Aggregation {
            op,
            field: field.into(),
        }
    }

    pub fn count() -> Self {
        Aggregation::new(AggregateOp::Count, "*")
    }
}

/// Compute one aggregation over a record sequence
///
/// Non-numeric and absent values are skipped by Sum/Avg/Min/Max; when
/// nothing numeric remains the result is Null.
pub fn aggregate(records: &[Record], agg: &Aggregation) -> Value {
    if agg.op == AggregateOp::Count {
        let count = if agg.field == "*" {
            records.len()
        } else {
            records
                .iter()
                .filter(|r| lookup_path(&r.data, &agg.field).map_or(false, |v| !v.is_null()))
                .count()
        };
        return Value::Int(count as i64);
    }

    let values: Vec<&Value> = records
        .iter()
        .filter_map(|r| lookup_path(&r.data, &agg.field))
        .filter(|v| v.as_f64().is_some())
        .collect();
    if values.is_empty() {
        return Value::Null;
    }

    match agg.op {
        AggregateOp::Sum => fold_sum(&values),
        AggregateOp::Avg => {
            let total: f64 = values.iter().filter_map(|v| v.as_f64()).sum();
            Value::Float(total / values.len() as f64)
        }
        AggregateOp::Min => extremum(&values, Ordering::Less),
        AggregateOp::Max => extremum(&values, Ordering::Greater),
        AggregateOp::Count => Value::Int(values.len() as i64),
    }
}

/// One group's key and its aggregation summary
#[derive(Debug, Clone)]
pub struct GroupRow {
    pub key: Value,
    pub summary: Document,
}

/// Group records, then summarize each group
///
/// Every summary carries `count` plus one `<op>_<field>` entry per
/// requested aggregation.
pub fn group_and_aggregate(
    records: &[Record],
    field: &str,
    aggregations: &[Aggregation],
) -> Vec<GroupRow> {
    group_by(records, field)
        .into_iter()
        .map(|group| {
            let mut summary = Document::new();
            summary.insert(
                "count".to_string(),
                Value::Int(group.records.len() as i64),
            );
            for agg in aggregations {
                let label = format!("{}_{}", agg.op.name(), agg.field);
                summary.insert(label, aggregate(&group.records, agg));
            }
            GroupRow {
                key: group.key,
                summary,
            }
        })
        .collect()
}

/// Join type: inner drops unmatched left rows, left preserves them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

/// Equality join of two record sequences into merged documents
///
/// Rows pair wherever `left[left_field] == right[right_field]`; Null or
/// missing keys never match. On a field name collision the left side wins.
/// Unmatched left rows survive a Left join with the right-side fields
/// absent.
pub fn join(
    left: &[Record],
    right: &[Record],
    left_field: &str,
    right_field: &str,
    join_type: JoinType,
) -> Vec<Document> {
    let mut rows = Vec::new();
    for left_record in left {
        let key = lookup_path(&left_record.data, left_field).filter(|v| !v.is_null());

        let mut matched = false;
        if let Some(key) = key {
            for right_record in right {
                let hit = lookup_path(&right_record.data, right_field)
                    .map_or(false, |rv| rv.loose_eq(key));
                if hit {
                    matched = true;
                    let mut merged = left_record.data.clone();
                    for (field, value) in &right_record.data {
                        merged
                            .entry(field.clone())
                            .or_insert_with(|| value.clone());
                    }
                    rows.push(merged);
                }
            }
        }
        if !matched && join_type == JoinType::Left {
            rows.push(left_record.data.clone());
        }
    }
    rows
}

// Aggregation helpers

/// Integer-preserving sum: stays Int until a Float appears
fn fold_sum(values: &[&Value]) -> Value {
    let mut acc = Value::Int(0);
    for &v in values {
        acc = match (&acc, v) {
            (Value::Int(a), Value::Int(b)) => Value::Int(a + b),
            _ => Value::Float(acc.as_f64().unwrap_or(0.0) + v.as_f64().unwrap_or(0.0)),
        };
    }
    acc
}

fn extremum(values: &[&Value], keep: Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for &v in values {
        best = match best {
            None => Some(v),
            Some(current) => {
                if v.compare(current) == Some(keep) {
                    Some(v)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.cloned().unwrap_or(Value::Null)
}

fn set_path(doc: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Document::new()));
            if let Value::Object(inner) = entry {
                set_path(inner, rest, value);
            }
        }
    }
}
