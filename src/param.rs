use crate::case::FilterCase;
use crate::config::FilterConfig;
use crate::queryable::Queryable;
use sea_orm::Order;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Separates the case keyword from the field in a parameter key.
pub const FIELD_DELIMITER: char = '_';
/// Separates the field from the secondary field, as in `where_has_authors__role`.
pub const FIELD_VALUE_DELIMITER: &str = "__";
/// Separates list items in `where*` values.
pub const LIST_DELIMITER: char = ',';
/// Wildcard used in `search` and `start_with` patterns.
pub const WILDCARD: &str = "%";

/// Callback behind a `filter_*` parameter or a case override.
///
/// Receives the query, the normalized value and the optional secondary field.
pub type FilterFn<Q> = Arc<dyn Fn(&mut Q, &FilterValue, Option<&str>) + Send + Sync>;

/// A parameter key decoded into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey<'a> {
    pub case: FilterCase,
    pub field: &'a str,
    pub secondary_field: Option<&'a str>,
}

/// Decodes `<case>_<field>` or `<case>_<field>__<secondary>`.
///
/// Returns `None` when the key does not start with a known case keyword.
#[must_use]
pub fn parse_key(key: &str) -> Option<ParsedKey<'_>> {
    FilterCase::ALL.into_iter().find_map(|case| {
        let remainder = key
            .strip_prefix(case.as_str())?
            .strip_prefix(FIELD_DELIMITER)?;
        let parts: Vec<&str> = remainder.split(FIELD_VALUE_DELIMITER).collect();
        let (field, secondary_field) = match parts.as_slice() {
            [field, secondary] => (*field, Some(*secondary)),
            _ => (remainder, None),
        };
        Some(ParsedKey {
            case,
            field,
            secondary_field,
        })
    })
}

/// A request value after case-specific normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl FilterValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// A loose scalar: a number when `raw` is numeric, `true`/`false` as booleans, text otherwise.
    #[must_use]
    pub fn scalar(raw: &str) -> Self {
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => Self::numeric(raw).unwrap_or_else(|| Self::Text(raw.to_owned())),
        }
    }

    fn numeric(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(integer) = raw.parse::<i64>() {
            return Some(Self::Integer(integer));
        }
        raw.parse::<f64>()
            .ok()
            .filter(|float| float.is_finite())
            .map(Self::Float)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::List(values) => f.write_str(&values.join(",")),
        }
    }
}

/// What a [`FilterParam`] targets: a column name or a bound callback.
pub enum FilterTarget<Q> {
    Field(String),
    Callback(FilterFn<Q>),
}

impl<Q> Clone for FilterTarget<Q> {
    fn clone(&self) -> Self {
        match self {
            Self::Field(field) => Self::Field(field.clone()),
            Self::Callback(callback) => Self::Callback(Arc::clone(callback)),
        }
    }
}

impl<Q> fmt::Debug for FilterTarget<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => f.debug_tuple("Field").field(field).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// One resolved filter instruction.
pub struct FilterParam<Q> {
    case: FilterCase,
    target: FilterTarget<Q>,
    value: Option<String>,
    secondary_field: Option<String>,
}

impl<Q> FilterParam<Q> {
    /// A parameter targeting a column. Use [`FilterParam::callback`] for `filter` parameters.
    pub fn new(case: FilterCase, field: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            case,
            target: FilterTarget::Field(field.into()),
            value: value.map(str::to_owned),
            secondary_field: None,
        }
    }

    /// A `filter` parameter bound to `callback`.
    pub fn callback(callback: FilterFn<Q>, value: Option<&str>) -> Self {
        Self {
            case: FilterCase::Filter,
            target: FilterTarget::Callback(callback),
            value: value.map(str::to_owned),
            secondary_field: None,
        }
    }

    #[must_use]
    pub fn with_secondary_field(mut self, secondary_field: Option<&str>) -> Self {
        self.secondary_field = secondary_field.map(str::to_owned);
        self
    }

    pub fn case(&self) -> FilterCase {
        self.case
    }

    pub fn target(&self) -> &FilterTarget<Q> {
        &self.target
    }

    /// The column name, `None` for callbacks.
    pub fn field(&self) -> Option<&str> {
        match &self.target {
            FilterTarget::Field(field) => Some(field),
            FilterTarget::Callback(_) => None,
        }
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn secondary_field(&self) -> Option<&str> {
        self.secondary_field.as_deref()
    }

    pub fn field_value_mandatory(&self) -> bool {
        self.case.field_value_mandatory()
    }

    /// The value the filter would apply, or `None` when it should be skipped.
    ///
    /// Absent values, `""` and `"null"` are always `None`.
    pub fn normalized_value(&self) -> Option<FilterValue> {
        let raw = self.value.as_deref()?;
        if raw.is_empty() || raw == "null" {
            return None;
        }
        match self.case {
            FilterCase::Where
            | FilterCase::WhereNot
            | FilterCase::WhereHas
            | FilterCase::WhereHasAll => Some(FilterValue::List(
                raw.split(LIST_DELIMITER).map(str::to_owned).collect(),
            )),
            FilterCase::Search => Some(FilterValue::Text(format!(
                "{WILDCARD}{}{WILDCARD}",
                raw.replace(' ', WILDCARD)
            ))),
            FilterCase::StartWith => {
                (!raw.contains(' ')).then(|| FilterValue::Text(format!("{raw}{WILDCARD}")))
            }
            FilterCase::From | FilterCase::To => FilterValue::numeric(raw),
            FilterCase::Sort => {
                matches!(raw, "asc" | "desc").then(|| FilterValue::Text(raw.to_owned()))
            }
            FilterCase::Filter => Some(match raw {
                "true" => FilterValue::Bool(true),
                "false" => FilterValue::Bool(false),
                _ => FilterValue::Text(raw.to_owned()),
            }),
        }
    }
}

impl<Q: Queryable> FilterParam<Q> {
    /// Adds this filter to `query`. Returns whether anything was applied.
    pub fn apply(&self, query: &mut Q) -> bool {
        let Some(value) = self.normalized_value() else {
            return false;
        };
        let field = match &self.target {
            FilterTarget::Callback(callback) => {
                callback(query, &value, self.secondary_field());
                return true;
            }
            FilterTarget::Field(field) => field.as_str(),
        };
        match (self.case, &value) {
            (FilterCase::From, _) => query.where_gte(field, &value),
            (FilterCase::To, _) => query.where_lte(field, &value),
            (FilterCase::Sort, FilterValue::Text(direction)) => {
                let order = if direction == "desc" {
                    Order::Desc
                } else {
                    Order::Asc
                };
                query.order_by(field, order);
            }
            (FilterCase::Search | FilterCase::StartWith, FilterValue::Text(pattern)) => {
                query.where_like(field, pattern, FilterConfig::current().like_operator);
            }
            (FilterCase::Where, FilterValue::List(values)) => query.where_in(field, values),
            (FilterCase::WhereNot, FilterValue::List(values)) => query.where_not_in(field, values),
            (FilterCase::WhereHas | FilterCase::WhereHasAll, FilterValue::List(values)) => {
                let Some(secondary) = self.secondary_field().filter(|s| !s.is_empty()) else {
                    return false;
                };
                if self.case == FilterCase::WhereHas {
                    query.where_has_in(field, secondary, values);
                } else {
                    for value in values {
                        query.where_has_eq(field, secondary, value);
                    }
                }
            }
            _ => return false,
        }
        tracing::trace!(case = %self.case, field, value = %value, "Applied filter");
        true
    }
}

impl<Q> Clone for FilterParam<Q> {
    fn clone(&self) -> Self {
        Self {
            case: self.case,
            target: self.target.clone(),
            value: self.value.clone(),
            secondary_field: self.secondary_field.clone(),
        }
    }
}

impl<Q> fmt::Debug for FilterParam<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterParam")
            .field("case", &self.case)
            .field("target", &self.target)
            .field("value", &self.value)
            .field("secondary_field", &self.secondary_field)
            .finish()
    }
}
