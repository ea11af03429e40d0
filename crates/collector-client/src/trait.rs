//! CollectorClient trait for mocking
//!
//! This trait abstracts the collector target API so that the controller can be
//! unit tested without reachable collector pods.

use crate::error::CollectorError;
use crate::models::TargetsResult;

/// Trait for collector target API operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait CollectorClientTrait: Send + Sync {
    /// Fetch the active targets of the collector at `pod_ip:port`
    async fn get_targets(&self, pod_ip: &str, port: i32) -> Result<TargetsResult, CollectorError>;
}
