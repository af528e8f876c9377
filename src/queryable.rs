use crate::config::LikeOperator;
use crate::error::FilterError;
use crate::param::FilterValue;
use async_trait::async_trait;
use sea_orm::Order;
use serde_json::Value;

/// The data source a [`RequestFilter`](crate::filter::RequestFilter) narrows down.
///
/// Builder methods mutate in place; the engine clones before applying so the value
/// handed to it is never modified. Implementations must make `clone` produce an
/// independent query.
#[async_trait]
pub trait Queryable: Clone + Send + Sync {
    /// Row type produced by [`Queryable::fetch_all`].
    type Item: Send;

    /// `field >= value`
    fn where_gte(&mut self, field: &str, value: &FilterValue);

    /// `field <= value`
    fn where_lte(&mut self, field: &str, value: &FilterValue);

    fn where_like(&mut self, field: &str, pattern: &str, operator: LikeOperator);

    fn where_in(&mut self, field: &str, values: &[String]);

    fn where_not_in(&mut self, field: &str, values: &[String]);

    /// At least one row of `relation` has `field` in `values`.
    fn where_has_in(&mut self, relation: &str, field: &str, values: &[String]);

    /// At least one row of `relation` has `field == value`.
    fn where_has_eq(&mut self, relation: &str, field: &str, value: &str);

    fn order_by(&mut self, field: &str, order: Order);

    /// Applies a named, reusable query fragment.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnknownScope`] when no scope with that name exists.
    fn apply_scope(&mut self, name: &str, args: &[Value]) -> Result<(), FilterError>;

    /// Stops loading related records alongside the result rows.
    fn without_eager_loading(&mut self) {}

    fn limit(&mut self, limit: u64);

    fn offset(&mut self, offset: u64);

    /// Currently applied `(limit, offset)`.
    fn pagination(&self) -> (Option<u64>, Option<u64>);

    /// Removes limit, offset and ordering so the query can be counted.
    fn strip_pagination(&mut self);

    /// # Errors
    ///
    /// Propagates store failures.
    async fn count(&self) -> Result<u64, FilterError>;

    /// # Errors
    ///
    /// Propagates store failures.
    async fn fetch_all(&self) -> Result<Vec<Self::Item>, FilterError>;
}
