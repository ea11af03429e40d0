//! Scrape endpoint declarations shared by PodMonitoring and ClusterPodMonitoring.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single port a monitoring resource scrapes metrics from.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeEndpoint {
    /// Container port to scrape, by name or by number
    pub port: EndpointPort,

    /// HTTP path to scrape metrics from (defaults to /metrics)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Scrape interval (e.g., "30s")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

impl ScrapeEndpoint {
    /// Endpoint on a named container port with default path and interval
    pub fn named(port: impl Into<String>) -> Self {
        Self {
            port: EndpointPort::Name(port.into()),
            path: None,
            interval: None,
        }
    }
}

/// Port reference that accepts either a container port name or a number.
///
/// Renders the same way in both cases as the port segment of a scrape pool
/// identifier: the name verbatim, or the number in decimal.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum EndpointPort {
    /// Numeric container port
    Number(i32),

    /// Named container port
    Name(String),
}

impl fmt::Display for EndpointPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointPort::Number(port) => write!(f, "{}", port),
            EndpointPort::Name(name) => f.write_str(name),
        }
    }
}

/// Label selector for the pods a monitoring resource targets
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PodSelector {
    /// Exact-match labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
}
