use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator keyword carried by a query parameter key, e.g. the `where` in `where_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCase {
    From,
    To,
    Sort,
    Search,
    WhereHasAll,
    WhereHas,
    WhereNot,
    Where,
    StartWith,
    Filter,
}

impl FilterCase {
    /// Every case in prefix-matching priority order.
    ///
    /// Keys are matched with "starts with `<case>_`", so `where_has_all` has to be
    /// tried before `where_has`, and both of them (plus `where_not`) before `where`.
    pub const ALL: [FilterCase; 10] = [
        FilterCase::From,
        FilterCase::To,
        FilterCase::Sort,
        FilterCase::Search,
        FilterCase::WhereHasAll,
        FilterCase::WhereHas,
        FilterCase::WhereNot,
        FilterCase::Where,
        FilterCase::StartWith,
        FilterCase::Filter,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::From => "from",
            Self::To => "to",
            Self::Sort => "sort",
            Self::Search => "search",
            Self::WhereHasAll => "where_has_all",
            Self::WhereHas => "where_has",
            Self::WhereNot => "where_not",
            Self::Where => "where",
            Self::StartWith => "start_with",
            Self::Filter => "filter",
        }
    }

    /// Relation-existence cases need a `field__secondary` key to be usable.
    #[must_use]
    pub const fn field_value_mandatory(self) -> bool {
        matches!(self, Self::WhereHas | Self::WhereHasAll)
    }

    /// Cases whose raw value is a comma separated list.
    #[must_use]
    pub const fn is_list(self) -> bool {
        matches!(
            self,
            Self::Where | Self::WhereNot | Self::WhereHas | Self::WhereHasAll
        )
    }
}

impl fmt::Display for FilterCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
