//! Status types written by the target status controller.
//!
//! Both monitoring kinds share `MonitoringStatus`. The controller only ever
//! rewrites `endpointStatuses`; everything else is owned by other writers.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Observed state of a PodMonitoring or ClusterPodMonitoring
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStatus {
    /// Generation of the spec last acted upon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Per-endpoint target health summaries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoint_statuses: Vec<ScrapeEndpointStatus>,
}

/// Target health summary of one scrape endpoint
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeEndpointStatus {
    /// Scrape pool identifier of the endpoint (e.g., "PodMonitoring/ns/name/port")
    pub name: String,

    /// Number of active targets discovered for the endpoint
    pub active_targets: i64,

    /// Number of active targets whose last scrape failed
    pub unhealthy_targets: i64,

    /// Time the collectors were polled for this summary
    pub last_update_time: DateTime<Utc>,

    /// Targets grouped by (health, last error), ordered by that pair
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_groups: Vec<SampleGroup>,

    /// Fraction of collectors that answered the poll, as a decimal string
    pub collectors_fraction: String,
}

/// All targets of an endpoint sharing one (health, last error) signature
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SampleGroup {
    /// A bounded, deterministic subset of the group's targets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_targets: Vec<SampleTarget>,

    /// Total number of targets in the group, including those not sampled
    pub count: i32,
}

/// Trimmed view of one active target
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SampleTarget {
    /// Target labels after relabeling
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Error of the last scrape, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    /// Duration of the last scrape in seconds, as a decimal string
    pub last_scrape_duration_seconds: String,

    /// Health of the last scrape ("up", "down" or "unknown")
    pub health: String,
}
