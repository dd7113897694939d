//! Vendor-specific billing metadata extraction.
//!
//! The platform has no shared schema for per-vendor billing metadata;
//! instead each recognized vendor gets its own resolution profile keyed on
//! the record's connection vendor id. Unrecognized vendors leave every
//! field at the placeholder.

use crate::fields::{parameter, parameter_chain, string_or_placeholder, PLACEHOLDER};
use cb_client::TierParameterSource;
use serde_json::Value;
use tracing::debug;

/// Microsoft CSP vendor account.
pub const MICROSOFT_VENDOR_ID: &str = "VA-888-104";
/// AWS marketplace vendor account.
pub const AWS_VENDOR_ID: &str = "VA-919-258";

/// The fixed vendor metadata set carried by every report row computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorMetadata {
    pub microsoft_domain: String,
    pub microsoft_subscription_id: String,
    pub microsoft_customer_id: String,
    pub microsoft_order_id: String,
    pub microsoft_plan_subscription_id: String,
    pub microsoft_tier1_mpn: String,
    pub aws_account_email: String,
    pub aws_account_name: String,
    pub aws_support_level: String,
    pub aws_account_id: String,
}

impl Default for VendorMetadata {
    fn default() -> Self {
        let placeholder = || PLACEHOLDER.to_string();
        Self {
            microsoft_domain: placeholder(),
            microsoft_subscription_id: placeholder(),
            microsoft_customer_id: placeholder(),
            microsoft_order_id: placeholder(),
            microsoft_plan_subscription_id: placeholder(),
            microsoft_tier1_mpn: placeholder(),
            aws_account_email: placeholder(),
            aws_account_name: placeholder(),
            aws_support_level: placeholder(),
            aws_account_id: placeholder(),
        }
    }
}

/// Extracts vendor metadata for one record.
///
/// Microsoft records additionally resolve the tier1 MPN through the
/// tier-scoped parameter source; a failed lookup degrades that one field to
/// the placeholder rather than failing the record.
pub async fn extract(record: &Value, tiers: &dyn TierParameterSource) -> VendorMetadata {
    let mut metadata = VendorMetadata::default();

    match record
        .pointer("/asset/connection/vendor/id")
        .and_then(Value::as_str)
    {
        Some(MICROSOFT_VENDOR_ID) => {
            metadata.microsoft_domain = parameter(record, "microsoft_domain");
            metadata.microsoft_subscription_id =
                parameter_chain(record, &["subscription_id", "microsoft_subscription_id"]);
            metadata.microsoft_customer_id =
                parameter_chain(record, &["ms_customer_id", "customer_id"]);
            metadata.microsoft_order_id =
                parameter_chain(record, &["microsoft_order_id", "csp_order_id"]);
            metadata.microsoft_plan_subscription_id =
                parameter(record, "microsoft_plan_subscription_id");
            metadata.microsoft_tier1_mpn = tier1_mpn(record, tiers).await;
        }
        Some(AWS_VENDOR_ID) => {
            metadata.aws_account_email = parameter(record, "awsAccountEmail");
            metadata.aws_account_name = parameter(record, "awsAccountName");
            metadata.aws_support_level = parameter(record, "awsOrderedSupportLevel");
            metadata.aws_account_id = parameter(record, "awsAccountId");
        }
        _ => {}
    }

    metadata
}

async fn tier1_mpn(record: &Value, tiers: &dyn TierParameterSource) -> String {
    let account_id = string_or_placeholder(record, "/asset/tiers/tier1/id");
    let product_id = string_or_placeholder(record, "/asset/product/id");
    if account_id == PLACEHOLDER || product_id == PLACEHOLDER {
        return PLACEHOLDER.to_string();
    }

    match tiers
        .tier_parameter(&account_id, &product_id, "tier1_mpn")
        .await
    {
        Ok(Some(value)) => value,
        Ok(None) => PLACEHOLDER.to_string(),
        Err(e) => {
            debug!(
                account_id = %account_id,
                product_id = %product_id,
                error = %e,
                "tier1 MPN lookup failed"
            );
            PLACEHOLDER.to_string()
        }
    }
}
