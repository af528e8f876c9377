use crate::case::FilterCase;
use crate::config::FilterConfig;
use crate::error::FilterError;
use crate::models::ListParams;
use crate::param::{FilterParam, parse_key};
use crate::queryable::Queryable;
use crate::request::FilterRequest;
use crate::response::{FilteredResponse, compile, compile_as, compile_with};
use crate::traits::{Filter, FilterRegistry};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Deferred operation replayed on the query after the filters.
pub type QueryCallback<Q> = Box<dyn Fn(&mut Q) + Send + Sync>;

/// Applies the filters of one request to a query.
///
/// Build one per request. Parameters are parsed once in [`RequestFilter::new`];
/// [`RequestFilter::builder`] and the `response*` methods apply them to a fresh
/// clone of the query every time, so the engine can be asked repeatedly.
///
/// ```ignore
/// let response = RequestFilter::new(BookFilter, SeaQuery::new(db, book::Entity::find()), query)?
///     .scope("published", vec![])
///     .query_callback(|query| query.where_in("format", &["paper".to_string()]))
///     .max_limit(100)
///     .response()
///     .await?;
/// ```
pub struct RequestFilter<F, Q, R> {
    filter: F,
    query: Q,
    request: R,
    params: ListParams,
    filters: Vec<FilterParam<Q>>,
    callbacks: Vec<QueryCallback<Q>>,
    scopes: BTreeMap<String, Vec<Value>>,
    excluded_scopes: HashSet<String>,
    max_limit: Option<i64>,
}

impl<F, Q, R> RequestFilter<F, Q, R>
where
    F: Filter<Q>,
    Q: Queryable,
    R: FilterRequest,
{
    /// Parses the request parameters against `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::WhitelistShape`] when `filter` declares a non-empty
    /// whitelist of the wrong shape for a case.
    pub fn new(filter: F, query: Q, request: R) -> Result<Self, FilterError> {
        validate_whitelists::<F, Q>(&filter)?;

        let mut registry = FilterRegistry::new();
        filter.register(&mut registry);
        let filters = parse_filters(&filter, &registry, &request);
        let params = ListParams::from_request(&request);

        Ok(Self {
            filter,
            query,
            request,
            params,
            filters,
            callbacks: Vec::new(),
            scopes: BTreeMap::new(),
            excluded_scopes: HashSet::new(),
            max_limit: None,
        })
    }

    /// Queues an operation to run on the query after the request filters.
    #[must_use]
    pub fn query_callback<C>(mut self, callback: C) -> Self
    where
        C: Fn(&mut Q) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
        self
    }

    /// Applies the named scope with `args`. Registering the same name again replaces its args.
    #[must_use]
    pub fn scope(mut self, name: impl Into<String>, args: Vec<Value>) -> Self {
        self.scopes.insert(name.into(), args);
        self
    }

    /// Skips the named scope, whether it was registered before or after this call.
    #[must_use]
    pub fn without_scope(mut self, name: impl Into<String>) -> Self {
        self.excluded_scopes.insert(name.into());
        self
    }

    /// Caps `limit`. A value `<= 0` removes the cap; an explicit positive `limit` from the
    /// request is then still honoured, and only an absent one leaves the query unlimited.
    #[must_use]
    pub fn max_limit(mut self, max_limit: i64) -> Self {
        self.max_limit = Some(max_limit);
        self
    }

    /// Filters kept from the request, in application order.
    pub fn filters(&self) -> &[FilterParam<Q>] {
        &self.filters
    }

    pub fn request(&self) -> &R {
        &self.request
    }

    /// Effective page size: the requested limit clamped to the maximum.
    pub fn limit(&self) -> Option<u64> {
        let max = self
            .max_limit
            .or_else(|| self.filter.max_limit())
            .unwrap_or_else(|| FilterConfig::current().default_max_limit);
        if max <= 0 {
            return self.params.limit;
        }
        let max = max.unsigned_abs();
        Some(self.params.limit.map_or(max, |limit| limit.min(max)))
    }

    pub fn offset(&self) -> u64 {
        self.params.offset.unwrap_or(0)
    }

    /// Runs the whole pipeline on `query`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnknownScope`] when a registered scope does not exist on the query.
    pub fn apply(&self, query: &mut Q) -> Result<(), FilterError> {
        self.filter.prepare_query(query);

        let mut sorted = false;
        for filter in &self.filters {
            let applied = filter.apply(query);
            sorted |= applied && filter.case() == FilterCase::Sort;
        }
        if !sorted {
            self.filter.default_sorting(query);
        }

        for callback in &self.callbacks {
            callback(query);
        }

        if self.params.is_pure() {
            query.without_eager_loading();
        }

        for (name, args) in &self.scopes {
            if self.excluded_scopes.contains(name) {
                tracing::trace!(scope = %name, "Skipping excluded scope");
                continue;
            }
            query.apply_scope(name, args)?;
        }

        if let Some(limit) = self.limit() {
            query.limit(limit);
        }
        query.offset(self.offset());
        Ok(())
    }

    /// A fresh clone of the query with everything applied.
    ///
    /// # Errors
    ///
    /// See [`RequestFilter::apply`].
    pub fn builder(&self) -> Result<Q, FilterError> {
        let mut query = self.query.clone();
        self.apply(&mut query)?;
        Ok(query)
    }

    /// # Errors
    ///
    /// Propagates scope and store failures.
    pub async fn response(&self) -> Result<FilteredResponse<Vec<Q::Item>>, FilterError> {
        compile(&self.builder()?).await
    }

    /// Response whose rows are converted into `T`, e.g. an API model.
    ///
    /// # Errors
    ///
    /// Propagates scope and store failures.
    pub async fn response_as<T>(&self) -> Result<FilteredResponse<Vec<T>>, FilterError>
    where
        T: From<Q::Item>,
    {
        compile_as(&self.builder()?).await
    }

    /// Response whose rows are passed through `transform`.
    ///
    /// # Errors
    ///
    /// Propagates scope and store failures.
    pub async fn response_with<T, C>(&self, transform: C) -> Result<FilteredResponse<T>, FilterError>
    where
        C: FnOnce(Vec<Q::Item>) -> T,
    {
        compile_with(&self.builder()?, transform).await
    }
}

fn validate_whitelists<F: Filter<Q>, Q>(filter: &F) -> Result<(), FilterError> {
    for case in FilterCase::ALL {
        if case == FilterCase::Filter {
            continue;
        }
        let whitelist = filter.filterable_fields(case);
        if !whitelist.is_empty() && whitelist.is_relation() != case.field_value_mandatory() {
            return Err(FilterError::WhitelistShape {
                case,
                expected: if case.field_value_mandatory() {
                    "relation"
                } else {
                    "field list"
                },
            });
        }
    }
    Ok(())
}

fn parse_filters<F, Q, R>(filter: &F, registry: &FilterRegistry<Q>, request: &R) -> Vec<FilterParam<Q>>
where
    F: Filter<Q>,
    R: FilterRequest,
{
    let mut filters = Vec::new();
    for (key, value) in request.query_pairs() {
        let Some(parsed) = parse_key(&key) else {
            continue;
        };
        let value = Some(value.as_str());

        let param = if parsed.case == FilterCase::Filter {
            let Some(callback) = registry.custom_filter(parsed.field) else {
                tracing::debug!(key = %key, "Dropping parameter: no custom filter registered");
                continue;
            };
            FilterParam::callback(callback, value)
        } else if let Some(callback) = registry.case_override(parsed.case, parsed.field) {
            FilterParam::callback(callback, value)
        } else {
            FilterParam::new(parsed.case, parsed.field, value)
        }
        .with_secondary_field(parsed.secondary_field);

        if !is_suitable(filter, &param) {
            tracing::debug!(key = %key, "Dropping parameter: field is not filterable");
            continue;
        }
        if param.normalized_value().is_none() {
            tracing::debug!(key = %key, value = ?value, "Dropping parameter: value rejected");
            continue;
        }
        filters.push(param);
    }
    filters
}

fn is_suitable<F: Filter<Q>, Q>(filter: &F, param: &FilterParam<Q>) -> bool {
    let case = param.case();
    if case == FilterCase::Filter {
        return true;
    }
    let Some(field) = param.field() else {
        return false;
    };
    if case.field_value_mandatory() {
        return param
            .secondary_field()
            .filter(|secondary| !secondary.is_empty())
            .is_some_and(|secondary| filter.filterable_fields(case).allows_relation(field, secondary));
    }
    filter.filterable_fields(case).allows_field(field)
}
