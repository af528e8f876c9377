use crate::case::FilterCase;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// A filter declared a whitelist of the wrong shape for a case. This is a wiring
    /// mistake, reported when the engine is constructed.
    #[error("filterable fields for `{case}` must be a {expected} whitelist")]
    WhitelistShape {
        case: FilterCase,
        expected: &'static str,
    },
    #[error("scope `{0}` is not defined on this query")]
    UnknownScope(String),
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl IntoResponse for FilterError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Filtered listing failed");
        let message = match self {
            FilterError::Db(_) => "Internal Server Error",
            FilterError::WhitelistShape { .. } | FilterError::UnknownScope(_) => {
                "Filter misconfigured"
            }
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(message.to_string())).into_response()
    }
}
