//! Scrape pool identifiers.
//!
//! Collectors tag every active target with the scrape pool it was discovered
//! through. The pool name encodes the monitoring resource and endpoint port:
//!
//! - `PodMonitoring/<namespace>/<name>/<port>`
//! - `ClusterPodMonitoring/<name>/<port>`

use crds::{MonitoringKind, ResourceKey};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScrapePoolError {
    #[error("malformed scrape pool identifier {id:?}: {reason}")]
    Malformed { id: String, reason: &'static str },
}

/// Decoded scrape pool identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScrapePoolId {
    pub kind: MonitoringKind,
    /// Empty for ClusterPodMonitoring
    pub namespace: String,
    pub name: String,
    pub port: String,
}

impl ScrapePoolId {
    /// Identifier of an endpoint of the resource identified by `key`
    pub fn for_endpoint(key: &ResourceKey, port: impl Into<String>) -> Self {
        Self {
            kind: key.kind,
            namespace: key.namespace.clone().unwrap_or_default(),
            name: key.name.clone(),
            port: port.into(),
        }
    }

    /// Identity of the resource owning this pool
    #[cfg(test)]
    pub fn resource_key(&self) -> ResourceKey {
        match self.kind {
            MonitoringKind::PodMonitoring => ResourceKey::pod_monitoring(&self.namespace, &self.name),
            MonitoringKind::ClusterPodMonitoring => ResourceKey::cluster_pod_monitoring(&self.name),
        }
    }
}

/// Encode a scrape pool identifier. `namespace` is ignored for cluster-scoped kinds.
pub fn encode(kind: MonitoringKind, namespace: &str, name: &str, port: &str) -> String {
    match kind {
        MonitoringKind::PodMonitoring => format!("{}/{}/{}/{}", kind, namespace, name, port),
        MonitoringKind::ClusterPodMonitoring => format!("{}/{}/{}", kind, name, port),
    }
}

/// Decode a scrape pool identifier
pub fn decode(id: &str) -> Result<ScrapePoolId, ScrapePoolError> {
    id.parse()
}

impl fmt::Display for ScrapePoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self.kind, &self.namespace, &self.name, &self.port))
    }
}

impl FromStr for ScrapePoolId {
    type Err = ScrapePoolError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| ScrapePoolError::Malformed { id: id.to_string(), reason };

        let segments: Vec<&str> = id.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(malformed("empty segment"));
        }
        let kind: MonitoringKind = segments[0]
            .parse()
            .map_err(|_| malformed("unknown kind"))?;

        match (kind, segments.as_slice()) {
            (MonitoringKind::PodMonitoring, [_, namespace, name, port]) => Ok(Self {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
                port: port.to_string(),
            }),
            (MonitoringKind::ClusterPodMonitoring, [_, name, port]) => Ok(Self {
                kind,
                namespace: String::new(),
                name: name.to_string(),
                port: port.to_string(),
            }),
            _ => Err(malformed("wrong number of segments")),
        }
    }
}
