use crate::error::FilterError;
use crate::queryable::Queryable;
use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Pagination metadata of a filtered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Meta {
    /// Applied page size, `null` when the listing is uncapped.
    pub limit: Option<u64>,
    pub offset: u64,
    /// Number of rows matching the filters, ignoring `limit` and `offset`.
    pub total: u64,
}

/// `{ "meta": { "limit", "offset", "total" }, "data": ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FilteredResponse<T> {
    pub meta: Meta,
    pub data: T,
}

impl<T: Serialize> IntoResponse for FilteredResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Compiles a fully configured query into a response, rows untouched.
///
/// # Errors
///
/// Propagates store failures from counting or fetching.
pub async fn compile<Q: Queryable>(query: &Q) -> Result<FilteredResponse<Vec<Q::Item>>, FilterError> {
    compile_with(query, |items| items).await
}

/// Compiles a response, converting every row into `R`.
///
/// # Errors
///
/// Propagates store failures from counting or fetching.
pub async fn compile_as<Q, R>(query: &Q) -> Result<FilteredResponse<Vec<R>>, FilterError>
where
    Q: Queryable,
    R: From<Q::Item>,
{
    compile_with(query, |items| items.into_iter().map(R::from).collect()).await
}

/// Compiles a response, handing the fetched rows to `transform`.
///
/// # Errors
///
/// Propagates store failures from counting or fetching.
pub async fn compile_with<Q, T, F>(query: &Q, transform: F) -> Result<FilteredResponse<T>, FilterError>
where
    Q: Queryable,
    F: FnOnce(Vec<Q::Item>) -> T,
{
    let mut counter = query.clone();
    counter.strip_pagination();
    let total = counter.count().await?;

    let (limit, offset) = query.pagination();
    let data = transform(query.fetch_all().await?);
    tracing::trace!(?limit, ?offset, total, "Compiled filtered response");

    Ok(FilteredResponse {
        meta: Meta {
            limit,
            offset: offset.unwrap_or(0),
            total,
        },
        data,
    })
}
