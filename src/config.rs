use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};

static CONFIG: RwLock<FilterConfig> = RwLock::new(FilterConfig::DEFAULT);

/// Operator used by `search_*` and `start_with_*` predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeOperator {
    #[default]
    Like,
    /// Case-insensitive match, PostgreSQL only.
    ILike,
}

/// Process-wide filtering settings.
///
/// Hosts either embed this struct in their own configuration (it deserializes with
/// defaults for missing keys) or read it from the environment with [`FilterConfig::from_env`],
/// then call [`FilterConfig::install`] once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Cap applied to `limit` when a filter does not set its own. `<= 0` disables the cap.
    pub default_max_limit: i64,
    pub like_operator: LikeOperator,
}

impl FilterConfig {
    pub const DEFAULT: Self = Self {
        default_max_limit: 30,
        like_operator: LikeOperator::Like,
    };

    /// Reads `FILTERABLE_DEFAULT_MAX_LIMIT` and `FILTERABLE_LIKE_OPERATOR`.
    /// Unset or unparseable variables keep their default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(limit) = std::env::var("FILTERABLE_DEFAULT_MAX_LIMIT")
            .ok()
            .and_then(|value| value.trim().parse().ok())
        {
            config.default_max_limit = limit;
        }
        if let Ok(operator) = std::env::var("FILTERABLE_LIKE_OPERATOR") {
            match operator.trim().to_lowercase().as_str() {
                "like" => config.like_operator = LikeOperator::Like,
                "ilike" => config.like_operator = LikeOperator::ILike,
                other => tracing::warn!(value = other, "Ignoring unknown FILTERABLE_LIKE_OPERATOR"),
            }
        }
        config
    }

    /// Replaces the process-wide settings.
    pub fn install(self) {
        *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = self;
        tracing::debug!(
            default_max_limit = self.default_max_limit,
            like_operator = ?self.like_operator,
            "Filter configuration installed"
        );
    }

    #[must_use]
    pub fn current() -> Self {
        *CONFIG.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
