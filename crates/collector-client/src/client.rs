//! Collector API client
//!
//! Queries the Prometheus-compatible target API of a single collector pod:
//! `GET http://<pod-ip>:<port>/api/v1/targets?state=active`

use crate::error::CollectorError;
use crate::models::{ApiResponse, TargetsResult};
use crate::collector_trait::CollectorClientTrait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// HTTP client for collector target APIs
#[derive(Debug, Clone)]
pub struct CollectorClient {
    client: Client,
}

impl CollectorClient {
    /// Create a new collector client
    ///
    /// # Arguments
    /// * `timeout` - Per-request timeout; bounds how long one slow collector can take
    pub fn new(timeout: Duration) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CollectorError::Http)?;

        Ok(Self { client })
    }

    /// Build the target API URL for a collector pod
    pub fn targets_url(pod_ip: &str, port: i32) -> String {
        if pod_ip.contains(':') {
            // IPv6 literal
            format!("http://[{}]:{}/api/v1/targets", pod_ip, port)
        } else {
            format!("http://{}:{}/api/v1/targets", pod_ip, port)
        }
    }

    /// Fetch the active targets of one collector
    pub async fn get_targets(&self, pod_ip: &str, port: i32) -> Result<TargetsResult, CollectorError> {
        let url = Self::targets_url(pod_ip, port);
        debug!("Fetching active targets from {}", url);

        let response = self.client
            .get(&url)
            .query(&[("state", "active")])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(CollectorError::Http)?;

        if response.status() == 404 {
            return Err(CollectorError::NotFound(format!("Target API not served at {}", url)));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CollectorError::Api(format!(
                "Failed to fetch targets from {}: {} - {}",
                url, status, body
            )));
        }

        let body = response.text().await?;
        parse_targets_response(&body)
    }
}

/// Decode a target API response body, unwrapping the status envelope
pub fn parse_targets_response(body: &str) -> Result<TargetsResult, CollectorError> {
    let envelope: ApiResponse<TargetsResult> = serde_json::from_str(body)?;
    if envelope.status != "success" {
        return Err(CollectorError::Api(format!(
            "{}: {}",
            envelope.error_type.as_deref().unwrap_or("unknown"),
            envelope.error.as_deref().unwrap_or("no error message"),
        )));
    }
    envelope
        .data
        .ok_or_else(|| CollectorError::Api("response has no data".to_string()))
}

#[async_trait::async_trait]
impl CollectorClientTrait for CollectorClient {
    async fn get_targets(&self, pod_ip: &str, port: i32) -> Result<TargetsResult, CollectorError> {
        CollectorClient::get_targets(self, pod_ip, port).await
    }
}
