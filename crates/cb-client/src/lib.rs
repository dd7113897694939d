//! # cb-client
//!
//! HTTP client for the commerce platform API: RQL-filtered collection
//! queries with lazy pagination, and tier-scoped configuration parameter
//! lookups.
//!
//! The pipeline in `cb-core` talks to this crate only through the
//! [`RecordSource`] and [`TierParameterSource`] traits, so tests can swap in
//! [`testing::MockCommercePlatform`].

pub mod client;
pub mod collection;
pub mod error;
pub mod http;
pub mod params;
pub mod rql;
pub mod testing;

pub use client::{CommerceClient, CommerceConfig};
pub use collection::{CollectionQuery, RecordSource};
pub use error::{ClientError, ClientResult};
pub use http::{AuthConfig, ClientConfig, HttpClient, RateLimitConfig};
pub use params::TierParameterSource;
pub use rql::RqlFilter;
