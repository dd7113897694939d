//! The two canonical source queries behind the report.

use cb_client::{CollectionQuery, RqlFilter};
use serde::{Deserialize, Serialize};

/// Requests collection.
pub const REQUESTS_PATH: &str = "/requests";
/// Recurring billing (subscription) requests collection.
pub const BILLING_REQUESTS_PATH: &str = "/subscriptions/requests";

/// Products excluded from the report on both sources.
pub const PRODUCTS_TO_SKIP: [&str; 3] = ["CN-165-840-738", "PRD-410-648-782", "PRD-351-327-555"];

const REQUEST_TYPES: [&str; 3] = ["purchase", "change", "cancel"];

/// Inclusive creation-date bounds, as ISO 8601 timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub after: String,
    pub before: String,
}

/// Caller-supplied report parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilter {
    pub date: Option<DateRange>,
}

/// Query for approved purchase/change/cancel requests on production
/// connections, most recent first.
pub fn request_query(filter: &ReportFilter) -> CollectionQuery {
    let mut rql = RqlFilter::new();
    if let Some(date) = &filter.date {
        rql = rql.ge("created", &date.after).le("created", &date.before);
    }
    rql = rql
        .eq("status", "approved")
        .eq("asset.connection.type", "production");
    for product in PRODUCTS_TO_SKIP {
        rql = rql.ne("asset.product.id", product);
    }
    rql = rql.one_of("type", &REQUEST_TYPES);

    CollectionQuery::new(REQUESTS_PATH)
        .filter(rql)
        .order_by("-created")
}

/// Query for approved vendor billing requests, most recent first.
pub fn billing_query(filter: &ReportFilter) -> CollectionQuery {
    let mut rql = RqlFilter::new();
    if let Some(date) = &filter.date {
        rql = rql
            .ge("events.created.at", &date.after)
            .le("events.created.at", &date.before);
    }
    rql = rql.eq("status", "approved").eq("type", "vendor");
    for product in PRODUCTS_TO_SKIP {
        rql = rql.ne("asset.product.id", product);
    }

    CollectionQuery::new(BILLING_REQUESTS_PATH)
        .filter(rql)
        .order_by("-events.created.at")
}
