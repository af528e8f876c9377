use crate::case::FilterCase;
use crate::models::Whitelist;
use crate::param::{FilterFn, FilterValue};
use convert_case::{Case, Casing};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A concrete filter: which fields a listing may be filtered on and how.
///
/// Only [`Filter::filterable_fields`] is required. Everything not whitelisted is
/// silently dropped, so the empty default of the other hooks is always safe.
pub trait Filter<Q>: Send + Sync {
    /// Whitelist for one case. Relation cases (`where_has`, `where_has_all`) expect
    /// [`Whitelist::Relations`], every other case [`Whitelist::Fields`].
    fn filterable_fields(&self, case: FilterCase) -> Whitelist;

    /// Registers `filter_*` callbacks and per-field case overrides.
    fn register(&self, _registry: &mut FilterRegistry<Q>) {}

    /// Runs before any filter, e.g. to add mandatory joins.
    fn prepare_query(&self, _query: &mut Q) {}

    /// Runs when no `sort_*` parameter ordered the query.
    fn default_sorting(&self, _query: &mut Q) {}

    /// Per-filter cap on `limit`. `None` falls back to the configured default.
    fn max_limit(&self) -> Option<i64> {
        None
    }
}

/// Filter without any whitelisted field. Only pagination, scopes and callbacks take effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicFilter;

impl<Q> Filter<Q> for BasicFilter {
    fn filterable_fields(&self, _case: FilterCase) -> Whitelist {
        Whitelist::default()
    }
}

/// Custom filters and case overrides of a [`Filter`], keyed by field token.
///
/// Tokens are compared in camelCase, so `filter_by_author` and `filter_byAuthor`
/// reach the same callback.
pub struct FilterRegistry<Q> {
    custom: HashMap<String, FilterFn<Q>>,
    overrides: HashMap<(FilterCase, String), FilterFn<Q>>,
}

impl<Q> FilterRegistry<Q> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    /// Handles `filter_<field>=<value>`.
    pub fn custom<F>(&mut self, field: &str, callback: F) -> &mut Self
    where
        F: Fn(&mut Q, &FilterValue, Option<&str>) + Send + Sync + 'static,
    {
        self.custom.insert(token(field), Arc::new(callback));
        self
    }

    /// Replaces the built-in handling of `<case>_<field>`. The callback receives the
    /// value normalized as a `filter` value.
    pub fn override_case<F>(&mut self, case: FilterCase, field: &str, callback: F) -> &mut Self
    where
        F: Fn(&mut Q, &FilterValue, Option<&str>) + Send + Sync + 'static,
    {
        if case == FilterCase::Filter {
            return self.custom(field, callback);
        }
        self.overrides.insert((case, token(field)), Arc::new(callback));
        self
    }

    pub fn custom_filter(&self, field: &str) -> Option<FilterFn<Q>> {
        self.custom.get(&token(field)).cloned()
    }

    pub fn case_override(&self, case: FilterCase, field: &str) -> Option<FilterFn<Q>> {
        self.overrides.get(&(case, token(field))).cloned()
    }
}

impl<Q> Default for FilterRegistry<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q> fmt::Debug for FilterRegistry<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn token(field: &str) -> String {
    field.to_case(Case::Camel)
}
