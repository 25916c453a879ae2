//! Quickwit Client
//!
//! Typed access to the parts of the Quickwit REST API the bootstrap needs:
//! health endpoints, index listing/creation and source listing/creation.

use super::http::{HttpResponse, QuickwitHttpClient};
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

/// Main Quickwit client
#[derive(Clone)]
pub struct QuickwitClient {
    pub http: QuickwitHttpClient,
    base_url: Url,
}

impl QuickwitClient {
    /// Create a new client for the node at `base_url`
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self> {
        let http = QuickwitHttpClient::new(request_timeout)?;
        Ok(Self { http, base_url })
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Join a path onto the base URL, keeping any path prefix the base carries
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Build `/api/v1/...` URL
    pub fn api_url(&self, path: &str) -> String {
        self.url(&format!("api/v1/{}", path.trim_start_matches('/')))
    }

    pub fn indexes_url(&self) -> String {
        self.api_url("indexes")
    }

    /// Build the sources collection URL of an index
    pub fn sources_url(&self, index_id: &str) -> String {
        self.api_url(&format!(
            "indexes/{}/sources",
            urlencoding::encode(index_id)
        ))
    }

    // =========================================================================
    // API calls
    // =========================================================================

    /// List the ids of all indexes
    pub async fn list_index_ids(&self) -> Result<BTreeSet<String>> {
        let response = self
            .http
            .get(&self.indexes_url())
            .await
            .context("Failed to list indexes")?;

        // Older releases return the config flattened, newer ones nest it
        extract_ids(&response, &["index_id", "index_config.index_id"])
    }

    /// List the ids of the sources attached to an index
    pub async fn list_source_ids(&self, index_id: &str) -> Result<BTreeSet<String>> {
        let response = self
            .http
            .get(&self.sources_url(index_id))
            .await
            .with_context(|| format!("Failed to list sources of index '{}'", index_id))?;

        extract_ids(&response, &["source_id"])
    }

    /// Submit an index config
    pub async fn create_index(&self, payload: &Value) -> Result<HttpResponse> {
        self.http.post(&self.indexes_url(), payload).await
    }

    /// Submit a source config under an index
    pub async fn create_source(&self, index_id: &str, payload: &Value) -> Result<HttpResponse> {
        self.http.post(&self.sources_url(index_id), payload).await
    }
}

/// Collect identifiers from a listing response
///
/// The response must be a JSON array. For each item the first path that
/// resolves to a non-empty string wins; items without one are skipped.
pub fn extract_ids(response: &Value, paths: &[&str]) -> Result<BTreeSet<String>> {
    let items = response
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Expected a JSON array in listing response"))?;

    Ok(items
        .iter()
        .filter_map(|item| {
            paths
                .iter()
                .find_map(|path| extract_json_str(item, path))
                .map(str::to_string)
        })
        .collect())
}

/// Follow a dotted path into a JSON value and return it if it is a non-empty string
pub fn extract_json_str<'a>(item: &'a Value, path: &str) -> Option<&'a str> {
    let mut current = item;
    for part in path.split('.') {
        current = current.get(part)?;
    }

    current.as_str().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> QuickwitClient {
        QuickwitClient::new(Url::parse(base).unwrap(), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_url_building() {
        let client = client("http://quickwit:7280");
        assert_eq!(client.indexes_url(), "http://quickwit:7280/api/v1/indexes");
        assert_eq!(client.url("/health/readyz"), "http://quickwit:7280/health/readyz");
    }

    #[test]
    fn test_url_building_keeps_path_prefix() {
        let client = client("http://proxy.local/quickwit/");
        assert_eq!(
            client.sources_url("logs"),
            "http://proxy.local/quickwit/api/v1/indexes/logs/sources"
        );
    }

    #[test]
    fn test_sources_url_encodes_index_id() {
        let client = client("http://quickwit:7280");
        assert_eq!(
            client.sources_url("app logs/v2"),
            "http://quickwit:7280/api/v1/indexes/app%20logs%2Fv2/sources"
        );
    }

    #[test]
    fn test_extract_ids_flat_and_nested() {
        let response = json!([
            {"index_id": "logs"},
            {"index_config": {"index_id": "traces"}},
            {"index_id": ""},
            {"unrelated": true}
        ]);

        let ids = extract_ids(&response, &["index_id", "index_config.index_id"]).unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["logs", "traces"]);
    }

    #[test]
    fn test_extract_ids_rejects_non_array() {
        let response = json!({"message": "internal error"});
        assert!(extract_ids(&response, &["source_id"]).is_err());
    }
}
