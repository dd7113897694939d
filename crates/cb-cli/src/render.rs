//! Report rendering: CSV rows or JSON mappings.

use anyhow::Result;
use cb_core::{RowResult, REPORT_HEADERS};
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::io::Write;

/// Writes the stream as CSV: the header row once, then one record per row.
pub async fn render_csv<W, S>(mut stream: S, writer: W) -> Result<u64>
where
    W: Write,
    S: Stream<Item = RowResult> + Unpin,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(REPORT_HEADERS)?;

    let mut rows = 0u64;
    while let Some(row) = stream.next().await {
        csv_writer.write_record(row?.to_csv_record())?;
        rows += 1;
    }
    csv_writer.flush()?;
    Ok(rows)
}

/// Writes the stream as a JSON array of objects keyed by derived header
/// names.
pub async fn render_json<W, S>(mut stream: S, writer: W) -> Result<u64>
where
    W: Write,
    S: Stream<Item = RowResult> + Unpin,
{
    let mut records = Vec::new();
    while let Some(row) = stream.next().await {
        records.push(Value::Object(row?.into_map()));
    }
    let rows = records.len() as u64;
    serde_json::to_writer_pretty(writer, &records)?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_core::ReportRow;
    use serde_json::json;

    fn sample_row() -> ReportRow {
        let mut values: Vec<Value> = vec![json!("-"); REPORT_HEADERS.len()];
        values[0] = json!("Change");
        values[1] = json!("PR-1");
        values[26] = json!(3);
        ReportRow::new(values)
    }

    #[tokio::test]
    async fn test_render_csv_emits_header_once() {
        let stream = futures::stream::iter(vec![Ok(sample_row()), Ok(sample_row())]);
        let mut buffer = Vec::new();
        let rows = render_csv(stream, &mut buffer).await.unwrap();

        assert_eq!(rows, 2);
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Request Type,Request ID"));
        assert!(lines[1].starts_with("Change,PR-1"));
        assert_eq!(text.matches("Request Type").count(), 1);
    }

    #[tokio::test]
    async fn test_render_json_rekeys_rows() {
        let stream = futures::stream::iter(vec![Ok(sample_row())]);
        let mut buffer = Vec::new();
        let rows = render_json(stream, &mut buffer).await.unwrap();

        assert_eq!(rows, 1);
        let parsed: Vec<Value> = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["request_type"], json!("Change"));
        assert_eq!(parsed[0]["item_delta"], json!(3));
    }
}
