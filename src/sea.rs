use crate::config::LikeOperator;
use crate::error::FilterError;
use crate::filter::RequestFilter;
use crate::param::FilterValue;
use crate::queryable::Queryable;
use crate::request::FilterRequest;
use crate::traits::Filter;
use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, ColumnType, DatabaseConnection, EntityName, EntityTrait, Order, PaginatorTrait,
    QueryTrait, Select,
    sea_query::{
        Alias, ConditionalStatement, Expr, OrderedStatement, Query, SelectStatement, SimpleExpr,
        extension::postgres::PgExpr,
    },
};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Stands in for "no limit" when an offset is set without one; SQLite and MySQL need both.
const UNBOUNDED_LIMIT: u64 = i64::MAX.unsigned_abs();

/// Named query fragment over the underlying select statement.
pub type SeaScope = Arc<dyn Fn(&mut SelectStatement, &[Value]) + Send + Sync>;

/// A to-many relation reachable from the filtered entity.
///
/// `where_has_<name>__<column>` matches rows of `table` whose `foreign_key`
/// equals the filtered entity's `local_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasRelation {
    pub table: String,
    pub foreign_key: String,
    pub local_key: String,
}

impl HasRelation {
    pub fn new(
        table: impl Into<String>,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            foreign_key: foreign_key.into(),
            local_key: local_key.into(),
        }
    }
}

/// [`Queryable`] over a Sea-ORM `Select`.
///
/// `fetch_all` loads the entity's own rows only. Callers that load related
/// models for the listing should check [`SeaQuery::eager_loading`] first,
/// since `pure` requests clear it.
pub struct SeaQuery<E: EntityTrait> {
    select: Select<E>,
    db: DatabaseConnection,
    table: String,
    relations: Arc<HashMap<String, HasRelation>>,
    scopes: Arc<HashMap<String, SeaScope>>,
    eager_loading: bool,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl<E: EntityTrait> SeaQuery<E> {
    pub fn new(db: DatabaseConnection, select: Select<E>) -> Self {
        Self {
            select,
            db,
            table: E::default().table_name().to_owned(),
            relations: Arc::new(HashMap::new()),
            scopes: Arc::new(HashMap::new()),
            eager_loading: true,
            limit: None,
            offset: None,
        }
    }

    #[must_use]
    pub fn with_relation(mut self, name: impl Into<String>, relation: HasRelation) -> Self {
        Arc::make_mut(&mut self.relations).insert(name.into(), relation);
        self
    }

    #[must_use]
    pub fn with_scope<F>(mut self, name: impl Into<String>, scope: F) -> Self
    where
        F: Fn(&mut SelectStatement, &[Value]) + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.scopes).insert(name.into(), Arc::new(scope));
        self
    }

    pub fn select(&self) -> &Select<E> {
        &self.select
    }

    pub fn into_select(self) -> Select<E> {
        self.select
    }

    /// Whether related records should be loaded with the rows. Cleared by `pure` requests.
    pub fn eager_loading(&self) -> bool {
        self.eager_loading
    }

    fn column(&self, field: &str) -> Expr {
        Expr::col((Alias::new(&self.table), Alias::new(field)))
    }

    fn and_where(&mut self, condition: SimpleExpr) {
        self.select.query().and_where(condition);
    }

    fn where_exists(&mut self, relation: &str, condition: SimpleExpr) {
        let Some(related) = self.relations.get(relation) else {
            tracing::warn!(relation, table = %self.table, "Relation is not registered, matching nothing");
            self.and_where(Expr::val(1).eq(0));
            return;
        };
        let mut subquery = Query::select();
        subquery
            .expr(Expr::val(1))
            .from(Alias::new(&related.table))
            .and_where(
                Expr::col((Alias::new(&related.table), Alias::new(&related.foreign_key)))
                    .equals((Alias::new(&self.table), Alias::new(&related.local_key))),
            )
            .and_where(condition);
        self.and_where(Expr::exists(subquery));
    }

    /// Binds a list item with the type of the column it is compared to.
    ///
    /// Items that cannot be read as that type are left out, so they match nothing.
    fn typed_value(&self, field: &str, raw: &str) -> Option<sea_orm::Value> {
        let Ok(column) = field.parse::<E::Column>() else {
            return Some(scalar_value(raw));
        };
        let value = match column.def().get_column_type() {
            ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::TinyUnsigned
            | ColumnType::SmallUnsigned
            | ColumnType::Unsigned
            | ColumnType::BigUnsigned => raw.trim().parse::<i64>().ok().map(sea_orm::Value::from),
            ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) | ColumnType::Money(_) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|float| float.is_finite())
                .map(sea_orm::Value::from),
            ColumnType::Boolean => match raw {
                "true" | "1" => Some(sea_orm::Value::from(true)),
                "false" | "0" => Some(sea_orm::Value::from(false)),
                _ => None,
            },
            _ => Some(sea_orm::Value::from(raw.to_owned())),
        };
        if value.is_none() {
            tracing::debug!(field, value = raw, table = %self.table, "List item does not fit the column type");
        }
        value
    }

    fn typed_values(&self, field: &str, values: &[String]) -> Vec<sea_orm::Value> {
        values
            .iter()
            .filter_map(|value| self.typed_value(field, value))
            .collect()
    }

    fn related_column(&self, relation: &str, field: &str) -> Expr {
        let table = self
            .relations
            .get(relation)
            .map_or(relation, |related| related.table.as_str());
        Expr::col((Alias::new(table), Alias::new(field)))
    }
}

/// Related tables are not typed here, so their values are bound loosely.
fn scalar_value(raw: &str) -> sea_orm::Value {
    match FilterValue::scalar(raw) {
        FilterValue::Bool(value) => sea_orm::Value::from(value),
        FilterValue::Integer(value) => sea_orm::Value::from(value),
        FilterValue::Float(value) => sea_orm::Value::from(value),
        _ => sea_orm::Value::from(raw.to_owned()),
    }
}

fn sea_value(value: &FilterValue) -> SimpleExpr {
    let value = match value {
        FilterValue::Bool(value) => sea_orm::Value::from(*value),
        FilterValue::Integer(value) => sea_orm::Value::from(*value),
        FilterValue::Float(value) => sea_orm::Value::from(*value),
        FilterValue::Text(value) => sea_orm::Value::from(value.clone()),
        FilterValue::List(values) => sea_orm::Value::from(values.join(",")),
    };
    SimpleExpr::Value(value)
}

#[async_trait]
impl<E> Queryable for SeaQuery<E>
where
    E: EntityTrait,
    E::Model: Sync,
{
    type Item = E::Model;

    fn where_gte(&mut self, field: &str, value: &FilterValue) {
        let condition = self.column(field).gte(sea_value(value));
        self.and_where(condition);
    }

    fn where_lte(&mut self, field: &str, value: &FilterValue) {
        let condition = self.column(field).lte(sea_value(value));
        self.and_where(condition);
    }

    fn where_like(&mut self, field: &str, pattern: &str, operator: LikeOperator) {
        let condition = match operator {
            LikeOperator::Like => self.column(field).like(pattern),
            LikeOperator::ILike => self.column(field).ilike(pattern),
        };
        self.and_where(condition);
    }

    fn where_in(&mut self, field: &str, values: &[String]) {
        let condition = self.column(field).is_in(self.typed_values(field, values));
        self.and_where(condition);
    }

    fn where_not_in(&mut self, field: &str, values: &[String]) {
        let condition = self.column(field).is_not_in(self.typed_values(field, values));
        self.and_where(condition);
    }

    fn where_has_in(&mut self, relation: &str, field: &str, values: &[String]) {
        let condition = self
            .related_column(relation, field)
            .is_in(values.iter().map(|value| scalar_value(value)));
        self.where_exists(relation, condition);
    }

    fn where_has_eq(&mut self, relation: &str, field: &str, value: &str) {
        let condition = self.related_column(relation, field).eq(scalar_value(value));
        self.where_exists(relation, condition);
    }

    fn order_by(&mut self, field: &str, order: Order) {
        let column = (Alias::new(&self.table), Alias::new(field));
        self.select.query().order_by(column, order);
    }

    fn apply_scope(&mut self, name: &str, args: &[Value]) -> Result<(), FilterError> {
        let scope = self
            .scopes
            .get(name)
            .cloned()
            .ok_or_else(|| FilterError::UnknownScope(name.to_owned()))?;
        scope(self.select.query(), args);
        tracing::trace!(scope = name, table = %self.table, "Applied scope");
        Ok(())
    }

    fn without_eager_loading(&mut self) {
        self.eager_loading = false;
    }

    fn limit(&mut self, limit: u64) {
        self.select.query().limit(limit);
        self.limit = Some(limit);
    }

    fn offset(&mut self, offset: u64) {
        // SQLite rejects OFFSET without LIMIT; a zero offset is a no-op anyway.
        if offset > 0 {
            let query = self.select.query();
            if self.limit.is_none() {
                query.limit(UNBOUNDED_LIMIT);
            }
            query.offset(offset);
        }
        self.offset = Some(offset);
    }

    fn pagination(&self) -> (Option<u64>, Option<u64>) {
        (self.limit, self.offset)
    }

    fn strip_pagination(&mut self) {
        let query = self.select.query();
        query.reset_limit();
        query.reset_offset();
        query.clear_order_by();
        self.limit = None;
        self.offset = None;
    }

    async fn count(&self) -> Result<u64, FilterError> {
        Ok(PaginatorTrait::count(self.select.clone(), &self.db).await?)
    }

    async fn fetch_all(&self) -> Result<Vec<Self::Item>, FilterError> {
        Ok(self.select.clone().all(&self.db).await?)
    }
}

impl<E: EntityTrait> Clone for SeaQuery<E> {
    fn clone(&self) -> Self {
        Self {
            select: self.select.clone(),
            db: self.db.clone(),
            table: self.table.clone(),
            relations: Arc::clone(&self.relations),
            scopes: Arc::clone(&self.scopes),
            eager_loading: self.eager_loading,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

impl<E: EntityTrait> fmt::Debug for SeaQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeaQuery")
            .field("table", &self.table)
            .field("relations", &self.relations)
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .field("eager_loading", &self.eager_loading)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

/// Entity glue: which filter an entity's listings use and how its query is set up.
///
/// The listing holds the entity's rows only; a `pure` request is visible to
/// custom loaders through [`SeaQuery::eager_loading`].
///
/// ```ignore
/// impl HasRequestFilter for book::Entity {
///     type ListFilter = BookFilter;
///
///     fn configure_query(query: SeaQuery<Self>) -> SeaQuery<Self> {
///         query.with_relation("tags", HasRelation::new("book_tags", "book_id", "id"))
///     }
/// }
/// ```
pub trait HasRequestFilter: EntityTrait {
    type ListFilter: Filter<SeaQuery<Self>> + Default;

    /// Registers relations and scopes on the base query.
    fn configure_query(query: SeaQuery<Self>) -> SeaQuery<Self> {
        query
    }

    /// # Errors
    ///
    /// Returns [`FilterError::WhitelistShape`] when the entity's filter is misconfigured.
    fn request_filter<R: FilterRequest>(
        db: &DatabaseConnection,
        request: R,
    ) -> Result<RequestFilter<Self::ListFilter, SeaQuery<Self>, R>, FilterError>
    where
        Self::Model: Sync,
    {
        let query = Self::configure_query(SeaQuery::new(db.clone(), Self::find()));
        RequestFilter::new(Self::ListFilter::default(), query, request)
    }
}
