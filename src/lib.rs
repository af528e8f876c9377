//! Whitelisted filtering, sorting and pagination of list endpoints from query-string parameters.
//!
//! A parameter key names an operator and a field: `where_status=open,closed`,
//! `from_price=10`, `sort_created_at=desc`, `where_has_authors__role=editor`.
//! A [`Filter`] declares which fields each operator may touch; everything else is
//! ignored. [`RequestFilter`] applies the surviving parameters to a [`Queryable`]
//! and compiles `{ meta: { limit, offset, total }, data }`.

pub mod case;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod param;
pub mod queryable;
pub mod request;
pub mod response;
pub mod routes;
pub mod sea;
pub mod traits;

pub use case::FilterCase;
pub use config::{FilterConfig, LikeOperator};
pub use error::FilterError;
pub use filter::RequestFilter;
pub use models::{ListParams, Whitelist};
pub use param::{FilterParam, FilterValue, parse_key};
pub use queryable::Queryable;
pub use request::{FilterRequest, RequestQuery};
pub use response::{FilteredResponse, Meta};
pub use sea::{HasRelation, HasRequestFilter, SeaQuery};
pub use traits::{BasicFilter, Filter, FilterRegistry};
