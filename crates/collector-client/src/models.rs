//! Collector target API models
//!
//! These models match the Prometheus-compatible `/api/v1/targets` response
//! served by every collector pod.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Response envelope of the collector HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// "success" or "error"
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Targets currently served by one collector
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetsResult {
    #[serde(rename = "activeTargets", default)]
    pub active: Vec<ActiveTarget>,
}

/// Health of a target's last scrape
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetHealth {
    Up,
    Down,
    #[default]
    Unknown,
}

impl TargetHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetHealth::Up => "up",
            TargetHealth::Down => "down",
            TargetHealth::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TargetHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One target as reported by a collector
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTarget {
    /// Labels after relabeling
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Scrape pool the target belongs to (e.g., "PodMonitoring/ns/name/port")
    pub scrape_pool: String,

    #[serde(default)]
    pub scrape_url: String,

    /// Error of the last scrape; empty when the scrape succeeded
    #[serde(default)]
    pub last_error: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scrape: Option<DateTime<Utc>>,

    /// Duration of the last scrape in seconds
    #[serde(default)]
    pub last_scrape_duration: f64,

    #[serde(default)]
    pub health: TargetHealth,
}

impl ActiveTarget {
    /// Create a target in the given scrape pool with no labels
    pub fn new(scrape_pool: impl Into<String>, health: TargetHealth) -> Self {
        Self {
            scrape_pool: scrape_pool.into(),
            health,
            ..Default::default()
        }
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = error.into();
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.last_scrape_duration = seconds;
        self
    }

    /// Last scrape error, treating the empty string as no error
    pub fn last_error(&self) -> Option<&str> {
        if self.last_error.is_empty() {
            None
        } else {
            Some(&self.last_error)
        }
    }
}
