//! # cb-core
//!
//! The crossbill report pipeline: fetches purchase/change/cancellation
//! requests and recurring billing subscriptions from the commerce platform,
//! expands each record into fixed-schema report rows on a bounded worker
//! pool, and merges both sources into a single output stream.

pub mod error;
pub mod fields;
pub mod pipeline;
pub mod progress;
pub mod queries;
pub mod schema;
pub mod transform;
pub mod vendor;

pub use error::ReportError;
pub use pipeline::{ReportPipeline, RowResult, DEFAULT_CONCURRENCY};
pub use progress::{ProgressSink, ProgressTracker};
pub use queries::{DateRange, ReportFilter};
pub use schema::{header_key, ReportRow, REPORT_HEADERS};
