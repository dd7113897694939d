//! In-memory platform stand-in for tests.

use crate::collection::{CollectionQuery, RecordSource};
use crate::error::{ClientError, ClientResult};
use crate::params::TierParameterSource;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use std::collections::HashMap;

/// Mock commerce platform backed by fixture records.
///
/// Records are keyed by collection path only; filters and ordering are
/// ignored, so fixtures should already be in the shape a real query would
/// return. A collection can be configured to fail mid-stream to exercise
/// fetch-error propagation.
#[derive(Default)]
pub struct MockCommercePlatform {
    collections: HashMap<String, Vec<Value>>,
    tier_params: HashMap<String, String>,
    failure: Option<(String, usize)>,
}

impl MockCommercePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers fixture records for a collection path.
    pub fn with_collection(mut self, path: &str, records: Vec<Value>) -> Self {
        self.collections.insert(path.to_string(), records);
        self
    }

    /// Registers a tier configuration parameter.
    pub fn with_tier_parameter(
        mut self,
        account_id: &str,
        product_id: &str,
        parameter: &str,
        value: &str,
    ) -> Self {
        self.tier_params.insert(
            tier_key(account_id, product_id, parameter),
            value.to_string(),
        );
        self
    }

    /// Makes the given collection's stream fail after yielding `after`
    /// records.
    pub fn failing_after(mut self, path: &str, after: usize) -> Self {
        self.failure = Some((path.to_string(), after));
        self
    }
}

fn tier_key(account_id: &str, product_id: &str, parameter: &str) -> String {
    format!("{}|{}|{}", account_id, product_id, parameter)
}

#[async_trait]
impl RecordSource for MockCommercePlatform {
    async fn count(&self, query: &CollectionQuery) -> ClientResult<u64> {
        Ok(self
            .collections
            .get(query.path())
            .map(|records| records.len() as u64)
            .unwrap_or(0))
    }

    fn records(&self, query: &CollectionQuery) -> BoxStream<'_, ClientResult<Value>> {
        let records = self
            .collections
            .get(query.path())
            .cloned()
            .unwrap_or_default();

        let mut items: Vec<ClientResult<Value>> = Vec::new();
        match &self.failure {
            Some((path, after)) if path == query.path() => {
                items.extend(records.into_iter().take(*after).map(Ok));
                items.push(Err(ClientError::ConnectionFailed(
                    "injected stream failure".to_string(),
                )));
            }
            _ => items.extend(records.into_iter().map(Ok)),
        }

        Box::pin(futures::stream::iter(items))
    }
}

#[async_trait]
impl TierParameterSource for MockCommercePlatform {
    async fn tier_parameter(
        &self,
        account_id: &str,
        product_id: &str,
        parameter: &str,
    ) -> ClientResult<Option<String>> {
        Ok(self
            .tier_params
            .get(&tier_key(account_id, product_id, parameter))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_mock_count_and_records() {
        let platform = MockCommercePlatform::new().with_collection(
            "/requests",
            vec![serde_json::json!({"id": "PR-1"}), serde_json::json!({"id": "PR-2"})],
        );
        let query = CollectionQuery::new("/requests");

        assert_eq!(platform.count(&query).await.unwrap(), 2);
        let records: Vec<Value> = platform.records(&query).try_collect().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], "PR-1");
    }

    #[tokio::test]
    async fn test_mock_injected_failure() {
        let platform = MockCommercePlatform::new()
            .with_collection(
                "/requests",
                vec![serde_json::json!({"id": "PR-1"}), serde_json::json!({"id": "PR-2"})],
            )
            .failing_after("/requests", 1);
        let query = CollectionQuery::new("/requests");

        let result: Result<Vec<Value>, _> = platform.records(&query).try_collect().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_tier_parameter() {
        let platform = MockCommercePlatform::new().with_tier_parameter(
            "TA-1", "PRD-1", "tier1_mpn", "MPN-42",
        );
        let value = platform
            .tier_parameter("TA-1", "PRD-1", "tier1_mpn")
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("MPN-42"));
        assert!(platform
            .tier_parameter("TA-1", "PRD-1", "missing")
            .await
            .unwrap()
            .is_none());
    }
}
