//! The fixed report schema and row type.

use serde_json::{Map, Value};

/// Report column headers, in output order.
///
/// Every emitted row carries exactly one value per header; the two render
/// modes differ only in whether headers become a leading CSV row or
/// per-object keys.
pub const REPORT_HEADERS: [&str; 34] = [
    "Request Type",
    "Request ID",
    "Product ID",
    "Product Name",
    "Vendor ID",
    "Vendor Name",
    "Request Created At",
    "Subscription Created At",
    "Subscription ID",
    "Subscription Status",
    "Subscription External ID",
    "Subscription Customer",
    "Customer external id",
    "Customer Country",
    "Tier 1 Company name",
    "Tier 1 External Id",
    "Tier 1 Country location",
    "Tier 2 Company name",
    "Tier 2 External Id",
    "Tier 2 Country location",
    "Item ID",
    "Item MPN",
    "Item Description",
    "Item Period",
    "Item Old Quantity",
    "Item Quantity",
    "Item delta",
    "Provider ID",
    "Provider Name",
    "Source MKP",
    "MKP Name",
    "Contract Type",
    "Microsoft Tier1 MPN",
    "AWS Account ID",
];

/// Derives the mapping-mode key for a header: lowercased, spaces replaced
/// with underscores.
pub fn header_key(header: &str) -> String {
    header.to_lowercase().replace(' ', "_")
}

/// One report row: an ordered sequence of values matching
/// [`REPORT_HEADERS`] 1:1.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    values: Vec<Value>,
}

impl ReportRow {
    /// Wraps a value sequence. The caller must supply one value per header.
    pub fn new(values: Vec<Value>) -> Self {
        debug_assert_eq!(values.len(), REPORT_HEADERS.len());
        Self { values }
    }

    /// The row's values in header order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Re-keys the row into a mapping from derived header names to values,
    /// preserving column order.
    pub fn into_map(self) -> Map<String, Value> {
        REPORT_HEADERS
            .iter()
            .zip(self.values)
            .map(|(header, value)| (header_key(header), value))
            .collect()
    }

    /// Renders the row as CSV fields.
    pub fn to_csv_record(&self) -> Vec<String> {
        self.values.iter().map(csv_field).collect()
    }
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
