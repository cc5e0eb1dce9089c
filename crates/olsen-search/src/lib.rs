//! Query engine, facet engine, and URL mapper for the Olsen catalog.

pub mod facet;
pub mod filter;
pub mod predicates;
pub mod query;
pub mod url;

pub use facet::{FacetCollection, FacetValue};
pub use filter::{Filter, SortBy, SortOrder};
pub use query::{PageResult, PhotoSummary};
pub use url::Breadcrumb;
