use crate::request::FilterRequest;
use serde::Deserialize;
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};

/// Request key carrying the page size.
pub const PARAM_LIMIT: &str = "limit";
/// Request key carrying the number of rows to skip.
pub const PARAM_OFFSET: &str = "offset";
/// Request key whose mere presence disables eager loading of relations.
pub const PARAM_PURE: &str = "pure";

/// Fields a filter accepts for one case.
///
/// `Fields` is for plain column cases (`where_status`, `sort_created_at`, ...).
/// `Relations` is for `where_has*` and maps each relation to the related columns
/// that may be matched, e.g. `authors => [role, name]` allows `where_has_authors__role`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Whitelist {
    Fields(Vec<String>),
    Relations(HashMap<String, Vec<String>>),
}

impl Whitelist {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fields(fields.into_iter().map(Into::into).collect())
    }

    pub fn relations<I, R, F, S>(relations: I) -> Self
    where
        I: IntoIterator<Item = (R, F)>,
        R: Into<String>,
        F: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Relations(
            relations
                .into_iter()
                .map(|(relation, fields)| {
                    (relation.into(), fields.into_iter().map(Into::into).collect())
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Fields(fields) => fields.is_empty(),
            Self::Relations(relations) => relations.is_empty(),
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, Self::Relations(_))
    }

    pub fn allows_field(&self, field: &str) -> bool {
        match self {
            Self::Fields(fields) => fields.iter().any(|allowed| allowed == field),
            Self::Relations(_) => false,
        }
    }

    pub fn allows_relation(&self, relation: &str, field: &str) -> bool {
        match self {
            Self::Relations(relations) => relations
                .get(relation)
                .is_some_and(|fields| fields.iter().any(|allowed| allowed == field)),
            Self::Fields(_) => false,
        }
    }
}

impl Default for Whitelist {
    fn default() -> Self {
        Self::Fields(Vec::new())
    }
}

/// Pagination and response-shaping parameters accepted next to the filters.
///
/// # Pagination
/// `limit` is capped by the filter's maximum; `offset` defaults to 0.
///
/// # Lean responses
/// Passing `pure` (with or without a value) skips loading related records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Maximum number of rows to return.
    #[param(example = 25)]
    pub limit: Option<u64>,
    /// Number of rows to skip.
    #[param(example = 0)]
    pub offset: Option<u64>,
    /// Present to disable eager loading of relations.
    pub pure: Option<String>,
}

impl ListParams {
    /// Reads the parameters from a request. Unparseable or non-positive limits count as absent.
    pub fn from_request<R: FilterRequest + ?Sized>(request: &R) -> Self {
        Self {
            limit: request
                .input(PARAM_LIMIT)
                .and_then(|limit| limit.trim().parse::<u64>().ok())
                .filter(|limit| *limit > 0),
            offset: request
                .input(PARAM_OFFSET)
                .and_then(|offset| offset.trim().parse::<u64>().ok()),
            pure: request
                .has(PARAM_PURE)
                .then(|| request.input(PARAM_PURE).unwrap_or_default()),
        }
    }

    pub fn is_pure(&self) -> bool {
        self.pure.is_some()
    }
}
