//! The commerce platform client.

use crate::collection::{CollectionQuery, RecordSource};
use crate::error::{ClientError, ClientResult};
use crate::http::{ClientConfig, HttpClient, RateLimitConfig};
use crate::params::TierParameterSource;
use crate::rql::RqlFilter;
use async_trait::async_trait;
use futures::stream::BoxStream;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

/// Collection of tier configuration requests.
const TIER_CONFIG_PATH: &str = "/tier/config-requests";

/// Platform client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommerceConfig {
    /// Base HTTP configuration.
    #[serde(flatten)]
    pub client: ClientConfig,
    /// Records fetched per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// TTL for cached tier parameter lookups, in seconds.
    #[serde(default = "default_param_cache_ttl_secs")]
    pub param_cache_ttl_secs: u64,
    /// Maximum number of cached tier parameter entries.
    #[serde(default = "default_param_cache_capacity")]
    pub param_cache_capacity: u64,
}

fn default_page_size() -> usize {
    100
}

fn default_param_cache_ttl_secs() -> u64 {
    300
}

fn default_param_cache_capacity() -> u64 {
    10_000
}

/// Client for the commerce platform API.
///
/// Implements [`RecordSource`] with lazy limit/offset pagination and
/// [`TierParameterSource`] with a TTL cache, since the same (account,
/// product) pair is looked up for every record of a vendor.
pub struct CommerceClient {
    http: HttpClient,
    page_size: usize,
    tier_cache: Cache<String, Option<String>>,
}

impl CommerceClient {
    /// Creates a new platform client.
    pub fn new(config: CommerceConfig) -> ClientResult<Self> {
        Self::with_rate_limit(config, None)
    }

    /// Creates a new platform client with client-side rate limiting.
    pub fn with_rate_limit(
        config: CommerceConfig,
        rate_limit: Option<RateLimitConfig>,
    ) -> ClientResult<Self> {
        let http = HttpClient::with_rate_limit(config.client, rate_limit)?;
        let tier_cache = Cache::builder()
            .time_to_live(Duration::from_secs(config.param_cache_ttl_secs))
            .max_capacity(config.param_cache_capacity)
            .build();
        info!(base_url = http.base_url(), "platform client initialized");
        Ok(Self {
            http,
            page_size: config.page_size,
            tier_cache,
        })
    }

    async fn fetch_page(&self, query: &CollectionQuery, offset: u64) -> ClientResult<Vec<Value>> {
        let path = query.page_path(self.page_size, offset);
        debug!(collection = query.path(), offset, "fetching page");
        let response = self.http.get(&path).await?;
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

/// Per-stream pagination state.
struct PageState {
    offset: u64,
    buffer: VecDeque<Value>,
    exhausted: bool,
}

#[async_trait]
impl RecordSource for CommerceClient {
    async fn count(&self, query: &CollectionQuery) -> ClientResult<u64> {
        let response = self.http.get(&query.page_path(0, 0)).await?;
        let header = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ClientError::InvalidResponse("Missing Content-Range header".to_string())
            })?;
        parse_content_range(header).ok_or_else(|| {
            ClientError::InvalidResponse(format!("Unparseable Content-Range: {}", header))
        })
    }

    fn records(&self, query: &CollectionQuery) -> BoxStream<'_, ClientResult<Value>> {
        let query = query.clone();
        let page_size = self.page_size;
        Box::pin(futures::stream::try_unfold(
            PageState {
                offset: 0,
                buffer: VecDeque::new(),
                exhausted: false,
            },
            move |mut state| {
                let query = query.clone();
                async move {
                    loop {
                        if let Some(record) = state.buffer.pop_front() {
                            return Ok(Some((record, state)));
                        }
                        if state.exhausted {
                            return Ok(None);
                        }
                        let page = self.fetch_page(&query, state.offset).await?;
                        if page.len() < page_size {
                            state.exhausted = true;
                        }
                        if page.is_empty() {
                            return Ok(None);
                        }
                        state.offset += page.len() as u64;
                        state.buffer.extend(page);
                    }
                }
            },
        ))
    }
}

#[async_trait]
impl TierParameterSource for CommerceClient {
    async fn tier_parameter(
        &self,
        account_id: &str,
        product_id: &str,
        parameter: &str,
    ) -> ClientResult<Option<String>> {
        let key = format!("{}|{}|{}", account_id, product_id, parameter);
        if let Some(cached) = self.tier_cache.get(&key).await {
            return Ok(cached);
        }

        let query = CollectionQuery::new(TIER_CONFIG_PATH).filter(
            RqlFilter::new()
                .eq("configuration.account.id", account_id)
                .eq("configuration.product.id", product_id),
        );
        let response = self.http.get(&query.page_path(1, 0)).await?;
        let records: Vec<Value> = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        let value = records
            .first()
            .and_then(|record| record.get("params"))
            .and_then(Value::as_array)
            .and_then(|params| {
                params.iter().find(|p| {
                    p.get("id").and_then(Value::as_str) == Some(parameter)
                        || p.get("name").and_then(Value::as_str) == Some(parameter)
                })
            })
            .and_then(|p| p.get("value"))
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(String::from);

        self.tier_cache.insert(key, value.clone()).await;
        Ok(value)
    }
}

/// Parses the total from a `Content-Range: items 0-99/1234` header.
fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("items 0-99/1234"), Some(1234));
        assert_eq!(parse_content_range("items 0-0/0"), Some(0));
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_config_defaults() {
        let json = serde_json::json!({
            "base_url": "https://api.example.com/public/v1",
            "auth": {"type": "none"}
        });
        let config: CommerceConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.page_size, 100);
        assert_eq!(config.param_cache_ttl_secs, 300);
    }
}
