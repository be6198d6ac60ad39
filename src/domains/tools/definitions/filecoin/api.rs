//! Client for the Filecoin penalty API.

use std::time::Duration;
use tracing::{info, warn};

use crate::domains::tools::ToolError;

/// Remote messages meaning the miner id does not name a miner.
const UNKNOWN_MINER_MARKERS: [&str; 4] = [
    "actor not found",
    "not a miner",
    "is not miner",
    "unknown miner",
];

/// Whether a response body reports an unknown miner.
pub fn is_unknown_miner(body: &str) -> bool {
    let body = body.to_lowercase();
    UNKNOWN_MINER_MARKERS.iter().any(|m| body.contains(m))
}

/// HTTP client for `GET {base}/penalty?miner=<id>`.
#[derive(Debug, Clone)]
pub struct FilecoinApi {
    client: reqwest::Client,
    base_url: String,
}

impl FilecoinApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("filecoin-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn penalty_url(&self) -> String {
        format!("{}/penalty", self.base_url)
    }

    /// Fetch the raw penalty response body for a miner.
    pub async fn miner_penalty(&self, miner_id: &str) -> Result<String, ToolError> {
        let url = self.penalty_url();
        info!("Fetching from {}?miner={}", url, miner_id);

        let response = self
            .client
            .get(&url)
            .query(&[("miner", miner_id)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Timeout
                } else {
                    ToolError::execution_failed(format!("request to {} failed: {}", url, e))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ToolError::execution_failed(format!("failed to read response body: {}", e))
        })?;

        if is_unknown_miner(&body) {
            return Err(ToolError::unknown_miner(miner_id));
        }

        if !status.is_success() {
            warn!("HTTP status code: {}, response data: {}", status, body);
            return Err(ToolError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::spawn_fake_api;
    use super::*;

    fn api(base: &str) -> FilecoinApi {
        FilecoinApi::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_unknown_miner_markers() {
        assert!(is_unknown_miner("resolution lookup failed: Actor Not Found"));
        assert!(is_unknown_miner("f0999 is not a miner actor"));
        assert!(!is_unknown_miner("{\"penalty\":\"1.2\"}"));
    }

    #[test]
    fn test_base_url_is_normalized() {
        assert_eq!(api(" http://node:1234/ ").base_url(), "http://node:1234");
    }

    #[tokio::test]
    async fn test_fetch_penalty() {
        let base = spawn_fake_api().await;
        let body = api(&base).miner_penalty("f01234").await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["miner"], "f01234");
    }

    #[tokio::test]
    async fn test_unknown_miner_is_recognized() {
        let base = spawn_fake_api().await;
        let err = api(&base).miner_penalty("f0999").await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownMiner(ref id) if id == "f0999"));
    }

    #[tokio::test]
    async fn test_upstream_failure_keeps_status() {
        let base = spawn_fake_api().await;
        let err = api(&base).miner_penalty("f0down").await.unwrap_err();
        assert!(matches!(err, ToolError::Upstream { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_api() {
        let err = api("http://127.0.0.1:1").miner_penalty("f01234").await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(_)));
    }
}
