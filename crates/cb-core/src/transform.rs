//! Record transformers: one source record in, zero or more report rows out.
//!
//! Both variants isolate failures per line item: a malformed item becomes an
//! [`ItemSkip`] and its siblings are still reported.

use crate::fields::{self, FieldError, PLACEHOLDER};
use crate::schema::ReportRow;
use crate::vendor::{self, VendorMetadata};
use cb_client::TierParameterSource;
use serde_json::{json, Value};

/// One line item that could not be transformed.
#[derive(Debug, Clone)]
pub struct ItemSkip {
    pub record_id: String,
    pub item_id: String,
    pub reason: String,
}

/// Output of transforming one source record.
#[derive(Debug, Clone, Default)]
pub struct RecordOutput {
    pub rows: Vec<ReportRow>,
    pub skips: Vec<ItemSkip>,
}

/// Expands a purchase/change/cancellation request into report rows.
///
/// Items where both the new and the old quantity are zero describe no
/// change and are omitted without a skip entry.
pub async fn transform_request(record: &Value, tiers: &dyn TierParameterSource) -> RecordOutput {
    let metadata = vendor::extract(record, tiers).await;
    transform_items(record, "/asset/items", &metadata, request_row)
}

/// Expands a billing subscription snapshot into report rows.
pub async fn transform_subscription(
    record: &Value,
    tiers: &dyn TierParameterSource,
) -> RecordOutput {
    let metadata = vendor::extract(record, tiers).await;
    transform_items(record, "/items", &metadata, subscription_row)
}

fn transform_items(
    record: &Value,
    items_pointer: &str,
    metadata: &VendorMetadata,
    row_fn: impl Fn(&Value, &Value, &VendorMetadata) -> Result<Option<ReportRow>, FieldError>,
) -> RecordOutput {
    let record_id = fields::string_or_placeholder(record, "/id");
    let mut output = RecordOutput::default();

    let Some(items) = record.pointer(items_pointer).and_then(Value::as_array) else {
        output.skips.push(ItemSkip {
            record_id,
            item_id: PLACEHOLDER.to_string(),
            reason: format!("missing items array at {}", items_pointer),
        });
        return output;
    };

    for item in items {
        let item_id = item
            .get("global_id")
            .and_then(Value::as_str)
            .unwrap_or(PLACEHOLDER)
            .to_string();
        match row_fn(record, item, metadata) {
            Ok(Some(row)) => output.rows.push(row),
            Ok(None) => {}
            Err(e) => output.skips.push(ItemSkip {
                record_id: record_id.clone(),
                item_id,
                reason: e.to_string(),
            }),
        }
    }

    output
}

fn request_row(
    record: &Value,
    item: &Value,
    metadata: &VendorMetadata,
) -> Result<Option<ReportRow>, FieldError> {
    let old_quantity = fields::quantity(item, "old_quantity")?;
    let quantity = fields::quantity(item, "quantity")?;
    // A no-op line item is not reportable.
    if quantity == 0 && old_quantity == 0 {
        return Ok(None);
    }

    let customer = required_tier(record, "customer")?;
    let tier1 = required_tier(record, "tier1")?;
    let tier2 = tier2_columns(record);

    let contract_type = fields::capitalize(
        record
            .pointer("/asset/contract/type")
            .and_then(Value::as_str)
            .unwrap_or("distribution"),
    );

    let row = ReportRow::new(vec![
        json!(fields::capitalize(fields::required_str(record, "/type")?)),
        json!(fields::required_str(record, "/id")?),
        json!(fields::required_str(record, "/asset/product/id")?),
        json!(fields::required_str(record, "/asset/product/name")?),
        json!(fields::required_str(record, "/asset/connection/vendor/id")?),
        json!(fields::required_str(record, "/asset/connection/vendor/name")?),
        json!(fields::normalize_datetime(fields::required_str(
            record, "/created"
        )?)),
        json!(fields::normalize_datetime(fields::required_str(
            record,
            "/asset/events/created/at"
        )?)),
        json!(fields::required_str(record, "/asset/id")?),
        json!(fields::required_str(record, "/asset/status")?),
        json!(fields::required_str(record, "/asset/external_id")?),
        json!(customer.name),
        json!(customer.external_id),
        json!(customer.country),
        json!(tier1.name),
        json!(tier1.external_id),
        json!(tier1.country),
        json!(tier2.name),
        json!(tier2.external_id),
        json!(tier2.country),
        json!(fields::required_str(item, "/global_id")?),
        json!(fields::required_str(item, "/mpn")?),
        json!(fields::required_str(item, "/display_name")?),
        json!(item_period(item)),
        item["old_quantity"].clone(),
        item["quantity"].clone(),
        json!(quantity - old_quantity),
        json!(fields::required_str(
            record,
            "/asset/connection/provider/id"
        )?),
        json!(fields::required_str(
            record,
            "/asset/connection/provider/name"
        )?),
        json!(fields::required_str(record, "/asset/marketplace/id")?),
        json!(fields::required_str(record, "/asset/marketplace/name")?),
        json!(contract_type),
        json!(metadata.microsoft_tier1_mpn),
        json!(metadata.aws_account_id),
    ]);
    Ok(Some(row))
}

fn subscription_row(
    record: &Value,
    item: &Value,
    metadata: &VendorMetadata,
) -> Result<Option<ReportRow>, FieldError> {
    let quantity = fields::quantity(item, "quantity")?;
    // -1 marks an unlimited entitlement; subscriptions carry no delta, the
    // current quantity is repeated in both columns.
    let reported_quantity = if quantity == -1 {
        json!("unlimited")
    } else {
        item["quantity"].clone()
    };

    let customer = required_tier(record, "customer")?;
    let tier1 = required_tier(record, "tier1")?;
    let tier2 = tier2_columns(record);

    let contract_id = fields::required_str(record, "/asset/contract/id")?;
    let contract_type = if contract_id.contains("CRU") {
        "Syndication"
    } else {
        "Distribution"
    };

    let row = ReportRow::new(vec![
        json!(format!(
            "{} Billing",
            fields::capitalize(fields::required_str(record, "/type")?)
        )),
        json!(fields::required_str(record, "/id")?),
        json!(fields::required_str(record, "/asset/product/id")?),
        json!(fields::required_str(record, "/asset/product/name")?),
        json!(fields::required_str(record, "/asset/connection/vendor/id")?),
        json!(fields::required_str(record, "/asset/connection/vendor/name")?),
        json!(fields::normalize_datetime(fields::required_str(
            record,
            "/events/created/at"
        )?)),
        json!(fields::normalize_datetime(fields::required_str(
            record,
            "/asset/events/created/at"
        )?)),
        json!(fields::required_str(record, "/asset/id")?),
        json!(fields::required_str(record, "/asset/status")?),
        json!(fields::required_str(record, "/asset/external_id")?),
        json!(customer.name),
        json!(customer.external_id),
        json!(customer.country),
        json!(tier1.name),
        json!(tier1.external_id),
        json!(tier1.country),
        json!(tier2.name),
        json!(tier2.external_id),
        json!(tier2.country),
        json!(fields::required_str(item, "/global_id")?),
        json!(fields::required_str(item, "/mpn")?),
        json!(fields::required_str(item, "/display_name")?),
        json!(item_period(item)),
        json!(0),
        reported_quantity.clone(),
        reported_quantity,
        json!(fields::required_str(
            record,
            "/asset/connection/provider/id"
        )?),
        json!(fields::required_str(
            record,
            "/asset/connection/provider/name"
        )?),
        json!(fields::required_str(record, "/asset/marketplace/id")?),
        json!(fields::required_str(record, "/asset/marketplace/name")?),
        json!(contract_type),
        json!(metadata.microsoft_tier1_mpn),
        json!(metadata.aws_account_id),
    ]);
    Ok(Some(row))
}

struct TierColumns {
    name: String,
    external_id: String,
    country: String,
}

/// Customer and tier1 identities are mandatory on every record; the
/// external id tolerates the older `external_uid` key.
fn required_tier(record: &Value, tier: &str) -> Result<TierColumns, FieldError> {
    let base = format!("/asset/tiers/{}", tier);
    let name = fields::required_str(record, &format!("{}/name", base))?.to_string();
    let external_id = record
        .pointer(&format!("{}/external_id", base))
        .and_then(Value::as_str)
        .or_else(|| {
            record
                .pointer(&format!("{}/external_uid", base))
                .and_then(Value::as_str)
        })
        .ok_or_else(|| FieldError::Missing(format!("{}/external_id", base)))?
        .to_string();
    let country = fields::required_str(record, &format!("{}/contact_info/country", base))?.to_string();
    Ok(TierColumns {
        name,
        external_id,
        country,
    })
}

/// Tier2 is optional end to end: the tier, its name, its external id, and
/// its country each degrade to the placeholder independently.
fn tier2_columns(record: &Value) -> TierColumns {
    let external_id = record
        .pointer("/asset/tiers/tier2/external_id")
        .and_then(Value::as_str)
        .or_else(|| {
            record
                .pointer("/asset/tiers/tier2/external_uid")
                .and_then(Value::as_str)
        })
        .unwrap_or(PLACEHOLDER)
        .to_string();
    TierColumns {
        name: fields::string_or_placeholder(record, "/asset/tiers/tier2/name"),
        external_id,
        country: fields::string_or_placeholder(record, "/asset/tiers/tier2/contact_info/country"),
    }
}

fn item_period(item: &Value) -> String {
    item.get("period")
        .and_then(Value::as_str)
        .or_else(|| item.get("item_type").and_then(Value::as_str))
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::REPORT_HEADERS;
    use cb_client::testing::MockCommercePlatform;
    use serde_json::json;

    fn sample_asset() -> Value {
        json!({
            "id": "AS-4000-1000",
            "status": "active",
            "external_id": "10001",
            "product": {"id": "PRD-100-200-300", "name": "Widget Suite"},
            "connection": {
                "type": "production",
                "vendor": {"id": "VA-000-111", "name": "Widget Vendor"},
                "provider": {"id": "PA-200-300", "name": "Widget Provider"}
            },
            "tiers": {
                "customer": {
                    "name": "Acme GmbH",
                    "external_id": "acme-1",
                    "contact_info": {"country": "DE"}
                },
                "tier1": {
                    "id": "TA-5001",
                    "name": "Reseller One",
                    "external_uid": "uid-r1",
                    "contact_info": {"country": "NL"}
                }
            },
            "marketplace": {"id": "MP-100", "name": "EU Marketplace"},
            "contract": {"id": "CRD-111-222", "type": "distribution"},
            "events": {"created": {"at": "2024-02-01T08:00:00+00:00"}},
            "params": []
        })
    }

    fn sample_request() -> Value {
        let mut record = json!({
            "id": "PR-4000-1000-2000",
            "type": "change",
            "created": "2024-03-01T10:15:00+00:00"
        });
        record["asset"] = sample_asset();
        record["asset"]["items"] = json!([
            {
                "global_id": "PRD-100-200-300-0001",
                "mpn": "MPN-A",
                "display_name": "Seat",
                "period": "monthly",
                "quantity": "5",
                "old_quantity": "2"
            }
        ]);
        record
    }

    fn sample_subscription() -> Value {
        let mut record = json!({
            "id": "BRP-7000-1000",
            "type": "vendor",
            "events": {"created": {"at": "2024-04-01T00:00:00+00:00"}}
        });
        record["asset"] = sample_asset();
        record["items"] = json!([
            {
                "global_id": "PRD-100-200-300-0001",
                "mpn": "MPN-A",
                "display_name": "Seat",
                "period": "monthly",
                "quantity": 10
            }
        ]);
        record
    }

    #[tokio::test]
    async fn test_request_row_shape_and_delta() {
        let output = transform_request(&sample_request(), &MockCommercePlatform::new()).await;
        assert_eq!(output.rows.len(), 1);
        assert!(output.skips.is_empty());

        let row = &output.rows[0];
        assert_eq!(row.len(), REPORT_HEADERS.len());
        assert_eq!(row.values()[0], json!("Change"));
        assert_eq!(row.values()[6], json!("2024-03-01 10:15:00"));
        // tier1 external id resolved through the external_uid fallback
        assert_eq!(row.values()[15], json!("uid-r1"));
        assert_eq!(row.values()[24], json!("2"));
        assert_eq!(row.values()[25], json!("5"));
        assert_eq!(row.values()[26], json!(3));
        assert_eq!(row.values()[31], json!("Distribution"));
    }

    #[tokio::test]
    async fn test_request_zero_change_item_not_reported() {
        let mut record = sample_request();
        record["asset"]["items"] = json!([
            {
                "global_id": "I-1", "mpn": "M-1", "display_name": "Noop",
                "period": "monthly", "quantity": "0", "old_quantity": "0"
            },
            {
                "global_id": "I-2", "mpn": "M-2", "display_name": "Grow",
                "period": "monthly", "quantity": "5", "old_quantity": "2"
            }
        ]);
        let output = transform_request(&record, &MockCommercePlatform::new()).await;
        assert_eq!(output.rows.len(), 1);
        assert!(output.skips.is_empty());
        assert_eq!(output.rows[0].values()[20], json!("I-2"));
        assert_eq!(output.rows[0].values()[26], json!(3));
    }

    #[tokio::test]
    async fn test_request_malformed_item_skipped_in_isolation() {
        let mut record = sample_request();
        record["asset"]["items"] = json!([
            {"global_id": "I-1", "display_name": "No MPN", "quantity": "1", "old_quantity": "0"},
            {
                "global_id": "I-2", "mpn": "M-2", "display_name": "Fine",
                "period": "monthly", "quantity": "4", "old_quantity": "1"
            }
        ]);
        let output = transform_request(&record, &MockCommercePlatform::new()).await;
        assert_eq!(output.rows.len(), 1);
        assert_eq!(output.skips.len(), 1);
        assert_eq!(output.skips[0].item_id, "I-1");
        assert_eq!(output.rows[0].values()[20], json!("I-2"));
    }

    #[tokio::test]
    async fn test_request_missing_tier2_degrades_to_placeholders() {
        let output = transform_request(&sample_request(), &MockCommercePlatform::new()).await;
        let row = &output.rows[0];
        assert_eq!(row.values()[17], json!("-"));
        assert_eq!(row.values()[18], json!("-"));
        assert_eq!(row.values()[19], json!("-"));
    }

    #[tokio::test]
    async fn test_request_tier2_name_degrades_independently() {
        let mut record = sample_request();
        record["asset"]["tiers"]["tier2"] = json!({
            "external_id": "t2-ext",
            "contact_info": {"country": "FR"}
        });
        let output = transform_request(&record, &MockCommercePlatform::new()).await;
        let row = &output.rows[0];
        assert_eq!(row.values()[17], json!("-"));
        assert_eq!(row.values()[18], json!("t2-ext"));
        assert_eq!(row.values()[19], json!("FR"));
    }

    #[tokio::test]
    async fn test_request_contract_type_defaults_to_distribution() {
        let mut record = sample_request();
        record["asset"]["contract"] = json!({"id": "CRD-1"});
        let output = transform_request(&record, &MockCommercePlatform::new()).await;
        assert_eq!(output.rows[0].values()[31], json!("Distribution"));
    }

    #[tokio::test]
    async fn test_subscription_row_label_and_quantities() {
        let output =
            transform_subscription(&sample_subscription(), &MockCommercePlatform::new()).await;
        assert_eq!(output.rows.len(), 1);

        let row = &output.rows[0];
        assert_eq!(row.len(), REPORT_HEADERS.len());
        assert_eq!(row.values()[0], json!("Vendor Billing"));
        assert_eq!(row.values()[6], json!("2024-04-01 00:00:00"));
        assert_eq!(row.values()[24], json!(0));
        assert_eq!(row.values()[25], json!(10));
        assert_eq!(row.values()[26], json!(10));
    }

    #[tokio::test]
    async fn test_subscription_unlimited_sentinel() {
        let mut record = sample_subscription();
        record["items"][0]["quantity"] = json!(-1);
        let output = transform_subscription(&record, &MockCommercePlatform::new()).await;
        let row = &output.rows[0];
        assert_eq!(row.values()[24], json!(0));
        assert_eq!(row.values()[25], json!("unlimited"));
        assert_eq!(row.values()[26], json!("unlimited"));
    }

    #[tokio::test]
    async fn test_subscription_contract_type_by_id_token() {
        let mut record = sample_subscription();
        record["asset"]["contract"]["id"] = json!("CRU-123");
        let output = transform_subscription(&record, &MockCommercePlatform::new()).await;
        assert_eq!(output.rows[0].values()[31], json!("Syndication"));

        let mut record = sample_subscription();
        record["asset"]["contract"]["id"] = json!("ABC-123");
        let output = transform_subscription(&record, &MockCommercePlatform::new()).await;
        assert_eq!(output.rows[0].values()[31], json!("Distribution"));
    }

    #[tokio::test]
    async fn test_missing_items_array_is_a_record_skip() {
        let mut record = sample_request();
        record["asset"]
            .as_object_mut()
            .unwrap()
            .remove("items");
        let output = transform_request(&record, &MockCommercePlatform::new()).await;
        assert!(output.rows.is_empty());
        assert_eq!(output.skips.len(), 1);
    }
}
