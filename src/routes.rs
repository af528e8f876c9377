use crate::error::FilterError;
use crate::request::RequestQuery;
use crate::response::FilteredResponse;
use crate::sea::HasRequestFilter;
use axum::extract::State;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;

/// Lists an entity with the filters of the request applied.
///
/// ```ignore
/// let app = Router::new()
///     .route("/books", get(filtered_list::<book::Entity>))
///     .with_state(db);
/// ```
///
/// # Errors
///
/// Misconfigured filters and database failures answer `500`.
pub async fn filtered_list<E>(
    State(db): State<DatabaseConnection>,
    query: RequestQuery,
) -> Result<FilteredResponse<Vec<<E as EntityTrait>::Model>>, FilterError>
where
    E: HasRequestFilter,
    <E as EntityTrait>::Model: Serialize + Sync,
{
    E::request_filter(&db, query)?.response().await
}
