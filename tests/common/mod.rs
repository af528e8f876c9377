#![allow(dead_code)]

use async_trait::async_trait;
use filterable::{
    Filter, FilterCase, FilterError, FilterRegistry, FilterValue, LikeOperator, Queryable,
    RequestQuery, Whitelist,
};
use sea_orm::Order;
use serde_json::{Map, Value, json};
use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};


pub type Row = Map<String, Value>;

/// Everything the engine asked of a [`MemoryQuery`], in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Gte(String, FilterValue),
    Lte(String, FilterValue),
    Like(String, String, LikeOperator),
    In(String, Vec<String>),
    NotIn(String, Vec<String>),
    HasIn(String, String, Vec<String>),
    HasEq(String, String, String),
    OrderBy(String, &'static str),
    Scope(String, Vec<Value>),
    WithoutEagerLoading,
    Limit(u64),
    Offset(u64),
}

/// In-memory [`Queryable`] over JSON rows. Relations are arrays of objects on the row.
///
/// Scopes are registered as `name => column`; applying one keeps rows whose column
/// equals the first argument (or `true` without arguments).
#[derive(Debug, Clone)]
pub struct MemoryQuery {
    rows: Arc<Vec<Row>>,
    scopes: Arc<Vec<(String, String)>>,
    pub ops: Vec<Op>,
    pub eager_loading: bool,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl MemoryQuery {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Arc::new(rows),
            scopes: Arc::new(Vec::new()),
            ops: Vec::new(),
            eager_loading: true,
            limit: None,
            offset: None,
        }
    }

    pub fn with_scope(mut self, name: &str, column: &str) -> Self {
        Arc::make_mut(&mut self.scopes).push((name.to_string(), column.to_string()));
        self
    }

    pub fn scope_names(&self) -> Vec<String> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Scope(name, _) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    fn matches(&self, row: &Row) -> bool {
        self.ops.iter().all(|op| match op {
            Op::Gte(field, value) => number(row.get(field)) >= as_f64(value),
            Op::Lte(field, value) => number(row.get(field)) <= as_f64(value),
            Op::Like(field, pattern, _) => {
                text(row.get(field)).is_some_and(|value| like(&value, pattern))
            }
            Op::In(field, values) => text(row.get(field)).is_some_and(|v| values.contains(&v)),
            Op::NotIn(field, values) => {
                !text(row.get(field)).is_some_and(|v| values.contains(&v))
            }
            Op::HasIn(relation, field, values) => related(row, relation)
                .any(|item| text(item.get(field)).is_some_and(|v| values.contains(&v))),
            Op::HasEq(relation, field, value) => related(row, relation)
                .any(|item| text(item.get(field)).as_deref() == Some(value.as_str())),
            Op::Scope(name, args) => {
                let column = self
                    .scopes
                    .iter()
                    .find_map(|(scope, column)| (scope == name).then_some(column));
                let expected = args.first().cloned().unwrap_or(Value::Bool(true));
                column.is_some_and(|column| row.get(column) == Some(&expected))
            }
            _ => true,
        })
    }

    fn evaluate(&self) -> Vec<Row> {
        let mut rows: Vec<Row> = self.rows.iter().filter(|row| self.matches(row)).cloned().collect();
        let orders: Vec<(&String, &str)> = self
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::OrderBy(field, direction) => Some((field, *direction)),
                _ => None,
            })
            .collect();
        rows.sort_by(|a, b| {
            for (field, direction) in &orders {
                let ordering = compare(a.get(*field), b.get(*field));
                let ordering = if *direction == "desc" { ordering.reverse() } else { ordering };
                if ordering != CmpOrdering::Equal {
                    return ordering;
                }
            }
            CmpOrdering::Equal
        });
        let offset = usize::try_from(self.offset.unwrap_or(0)).unwrap();
        let limit = self.limit.map_or(usize::MAX, |limit| usize::try_from(limit).unwrap());
        rows.into_iter().skip(offset).take(limit).collect()
    }
}

#[async_trait]
impl Queryable for MemoryQuery {
    type Item = Row;

    fn where_gte(&mut self, field: &str, value: &FilterValue) {
        self.ops.push(Op::Gte(field.to_string(), value.clone()));
    }

    fn where_lte(&mut self, field: &str, value: &FilterValue) {
        self.ops.push(Op::Lte(field.to_string(), value.clone()));
    }

    fn where_like(&mut self, field: &str, pattern: &str, operator: LikeOperator) {
        self.ops
            .push(Op::Like(field.to_string(), pattern.to_string(), operator));
    }

    fn where_in(&mut self, field: &str, values: &[String]) {
        self.ops.push(Op::In(field.to_string(), values.to_vec()));
    }

    fn where_not_in(&mut self, field: &str, values: &[String]) {
        self.ops.push(Op::NotIn(field.to_string(), values.to_vec()));
    }

    fn where_has_in(&mut self, relation: &str, field: &str, values: &[String]) {
        self.ops.push(Op::HasIn(
            relation.to_string(),
            field.to_string(),
            values.to_vec(),
        ));
    }

    fn where_has_eq(&mut self, relation: &str, field: &str, value: &str) {
        self.ops.push(Op::HasEq(
            relation.to_string(),
            field.to_string(),
            value.to_string(),
        ));
    }

    fn order_by(&mut self, field: &str, order: Order) {
        let direction = if matches!(order, Order::Desc) { "desc" } else { "asc" };
        self.ops.push(Op::OrderBy(field.to_string(), direction));
    }

    fn apply_scope(&mut self, name: &str, args: &[Value]) -> Result<(), FilterError> {
        if !self.scopes.iter().any(|(scope, _)| scope == name) {
            return Err(FilterError::UnknownScope(name.to_string()));
        }
        self.ops.push(Op::Scope(name.to_string(), args.to_vec()));
        Ok(())
    }

    fn without_eager_loading(&mut self) {
        self.eager_loading = false;
        self.ops.push(Op::WithoutEagerLoading);
    }

    fn limit(&mut self, limit: u64) {
        self.limit = Some(limit);
        self.ops.push(Op::Limit(limit));
    }

    fn offset(&mut self, offset: u64) {
        self.offset = Some(offset);
        self.ops.push(Op::Offset(offset));
    }

    fn pagination(&self) -> (Option<u64>, Option<u64>) {
        (self.limit, self.offset)
    }

    fn strip_pagination(&mut self) {
        self.limit = None;
        self.offset = None;
        self.ops
            .retain(|op| !matches!(op, Op::Limit(_) | Op::Offset(_) | Op::OrderBy(..)));
    }

    async fn count(&self) -> Result<u64, FilterError> {
        Ok(self.evaluate().len() as u64)
    }

    async fn fetch_all(&self) -> Result<Vec<Row>, FilterError> {
        Ok(self.evaluate())
    }
}

fn related<'a>(row: &'a Row, relation: &str) -> impl Iterator<Item = &'a Row> {
    row.get(relation)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn number(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(f64::NAN)
}

fn as_f64(value: &FilterValue) -> f64 {
    match value {
        FilterValue::Integer(value) => *value as f64,
        FilterValue::Float(value) => *value,
        _ => f64::NAN,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a.and_then(Value::as_f64), b.and_then(Value::as_f64)) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(CmpOrdering::Equal),
        _ => text(a).cmp(&text(b)),
    }
}

fn like(value: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('%').collect();
    let last = parts.len() - 1;
    let mut rest = value;
    for (index, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if index == 0 {
            let Some(stripped) = rest.strip_prefix(part) else {
                return false;
            };
            rest = stripped;
        } else if index == last {
            return rest.ends_with(part);
        } else {
            let Some(position) = rest.find(part) else {
                return false;
            };
            rest = &rest[position + part.len()..];
        }
    }
    last > 0 || rest.is_empty()
}

/// Filter over [`books`], counting how often the default sort ran.
#[derive(Debug, Default, Clone)]
pub struct BookFilter {
    pub default_sorts: Arc<AtomicUsize>,
    pub max_limit: Option<i64>,
}

impl BookFilter {
    pub fn default_sort_count(&self) -> usize {
        self.default_sorts.load(Ordering::SeqCst)
    }
}

impl Filter<MemoryQuery> for BookFilter {
    fn filterable_fields(&self, case: FilterCase) -> Whitelist {
        match case {
            FilterCase::From | FilterCase::To => Whitelist::fields(["price", "year"]),
            FilterCase::Sort => Whitelist::fields(["title", "price", "year"]),
            FilterCase::Search | FilterCase::StartWith => Whitelist::fields(["title"]),
            FilterCase::Where | FilterCase::WhereNot => Whitelist::fields(["status", "id"]),
            FilterCase::WhereHas | FilterCase::WhereHasAll => {
                Whitelist::relations([("tags", vec!["name"]), ("authors", vec!["role"])])
            }
            FilterCase::Filter => Whitelist::default(),
        }
    }

    fn register(&self, registry: &mut FilterRegistry<MemoryQuery>) {
        registry
            .custom("cheap", |query, value, _| {
                if *value == FilterValue::Bool(true) {
                    query.where_lte("price", &FilterValue::Integer(10));
                }
            })
            .custom("by_author_role", |query, value, secondary| {
                let relation = secondary.unwrap_or("authors");
                query.where_has_eq(relation, "role", &value.to_string());
            })
            .override_case(FilterCase::Where, "genre", |query, value, _| {
                query.where_in("genre_code", &[value.to_string().to_uppercase()]);
            });
    }

    fn default_sorting(&self, query: &mut MemoryQuery) {
        self.default_sorts.fetch_add(1, Ordering::SeqCst);
        query.order_by("id", Order::Asc);
    }

    fn max_limit(&self) -> Option<i64> {
        self.max_limit
    }
}

pub fn request(query: &str) -> RequestQuery {
    RequestQuery::from_raw(Some(query))
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("rows are objects"),
    }
}

pub fn books() -> Vec<Row> {
    vec![
        row(json!({
            "id": 1, "title": "Rust in Action", "price": 40, "year": 2021,
            "status": "published", "genre_code": "TECH", "published": true,
            "tags": [{"name": "rust"}, {"name": "systems"}],
            "authors": [{"role": "author"}],
        })),
        row(json!({
            "id": 2, "title": "Rust Atomics", "price": 30, "year": 2023,
            "status": "published", "genre_code": "TECH", "published": true,
            "tags": [{"name": "rust"}],
            "authors": [{"role": "editor"}],
        })),
        row(json!({
            "id": 3, "title": "Cooking Basics", "price": 8, "year": 2015,
            "status": "draft", "genre_code": "FOOD", "published": false,
            "tags": [{"name": "food"}],
            "authors": [],
        })),
        row(json!({
            "id": 4, "title": "Systems Thinking", "price": 25, "year": 2008,
            "status": "archived", "genre_code": "SCI", "published": true,
            "tags": [{"name": "systems"}],
            "authors": [{"role": "author"}, {"role": "editor"}],
        })),
        row(json!({
            "id": 5, "title": "Cheap Tricks", "price": 5, "year": 2019,
            "status": "published", "genre_code": "FUN", "published": true,
            "tags": [],
            "authors": [],
        })),
    ]
}

pub fn book_query() -> MemoryQuery {
    MemoryQuery::new(books())
        .with_scope("published", "published")
        .with_scope("status", "status")
}

pub fn ids(rows: &[Row]) -> Vec<i64> {
    rows.iter().filter_map(|row| row.get("id").and_then(Value::as_i64)).collect()
}
