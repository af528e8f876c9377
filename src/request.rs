use axum::{extract::FromRequestParts, http::Uri, http::request::Parts};
use std::convert::Infallible;

/// Read-only view of the incoming request the engine needs.
pub trait FilterRequest: Send + Sync {
    /// The raw (still percent-encoded) query string, without the leading `?`.
    fn query_string(&self) -> Option<&str>;

    /// Decoded key/value pairs in the order they appear, duplicates included.
    fn query_pairs(&self) -> Vec<(String, String)> {
        self.query_string()
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The last value given for `key`.
    fn input(&self, key: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .rev()
            .find_map(|(name, value)| (name == key).then_some(value))
    }

    fn has(&self, key: &str) -> bool {
        self.query_pairs().iter().any(|(name, _)| name == key)
    }
}

/// Query string of a request, usable as an axum extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestQuery {
    raw: Option<String>,
}

impl RequestQuery {
    pub fn from_raw(raw: Option<&str>) -> Self {
        Self {
            raw: raw.map(|query| query.trim_start_matches('?').to_owned()),
        }
    }
}

impl FilterRequest for RequestQuery {
    fn query_string(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}

impl FilterRequest for Uri {
    fn query_string(&self) -> Option<&str> {
        self.query()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestQuery {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_raw(parts.uri.query()))
    }
}
