//! Kind-agnostic view over the two monitoring CRDs.
//!
//! `MonitoringResource` is a tagged variant over `PodMonitoring` and
//! `ClusterPodMonitoring`. Code that only needs identity, declared endpoints
//! and endpoint statuses works against this type instead of either CRD.

use crate::cluster_pod_monitoring::ClusterPodMonitoring;
use crate::endpoint::ScrapeEndpoint;
use crate::pod_monitoring::PodMonitoring;
use crate::status::{MonitoringStatus, ScrapeEndpointStatus};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors describing structurally invalid monitoring resources
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// Object has no metadata.name
    #[error("{0} is missing metadata.name")]
    MissingName(MonitoringKind),

    /// Namespaced object has no metadata.namespace
    #[error("{kind} {name} is missing metadata.namespace")]
    MissingNamespace { kind: MonitoringKind, name: String },

    /// Kind token is neither PodMonitoring nor ClusterPodMonitoring
    #[error("unknown monitoring kind: {0}")]
    UnknownKind(String),
}

/// The two monitoring resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MonitoringKind {
    /// Namespaced `PodMonitoring`
    PodMonitoring,
    /// Cluster-scoped `ClusterPodMonitoring`
    ClusterPodMonitoring,
}

impl MonitoringKind {
    /// Kind name as it appears in manifests and scrape pool identifiers
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitoringKind::PodMonitoring => "PodMonitoring",
            MonitoringKind::ClusterPodMonitoring => "ClusterPodMonitoring",
        }
    }

    /// Whether objects of this kind live in a namespace
    pub fn is_namespaced(&self) -> bool {
        matches!(self, MonitoringKind::PodMonitoring)
    }
}

impl fmt::Display for MonitoringKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitoringKind {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PodMonitoring" => Ok(MonitoringKind::PodMonitoring),
            "ClusterPodMonitoring" => Ok(MonitoringKind::ClusterPodMonitoring),
            other => Err(ResourceError::UnknownKind(other.to_string())),
        }
    }
}

/// Identity of a monitoring resource in the cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub kind: MonitoringKind,
    /// Always `None` for ClusterPodMonitoring
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceKey {
    pub fn pod_monitoring(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: MonitoringKind::PodMonitoring,
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn cluster_pod_monitoring(name: impl Into<String>) -> Self {
        Self {
            kind: MonitoringKind::ClusterPodMonitoring,
            namespace: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{} {}/{}", self.kind, namespace, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// A PodMonitoring or a ClusterPodMonitoring
#[derive(Debug, Clone)]
pub enum MonitoringResource {
    Pod(PodMonitoring),
    Cluster(ClusterPodMonitoring),
}

impl MonitoringResource {
    pub fn kind(&self) -> MonitoringKind {
        match self {
            MonitoringResource::Pod(_) => MonitoringKind::PodMonitoring,
            MonitoringResource::Cluster(_) => MonitoringKind::ClusterPodMonitoring,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            MonitoringResource::Pod(pm) => pm.metadata.name.as_deref(),
            MonitoringResource::Cluster(cpm) => cpm.metadata.name.as_deref(),
        }
    }

    /// Namespace of a PodMonitoring; always `None` for ClusterPodMonitoring
    pub fn namespace(&self) -> Option<&str> {
        match self {
            MonitoringResource::Pod(pm) => pm.metadata.namespace.as_deref(),
            MonitoringResource::Cluster(_) => None,
        }
    }

    pub fn resource_version(&self) -> Option<&str> {
        match self {
            MonitoringResource::Pod(pm) => pm.metadata.resource_version.as_deref(),
            MonitoringResource::Cluster(cpm) => cpm.metadata.resource_version.as_deref(),
        }
    }

    /// Declared scrape endpoints in declaration order
    pub fn endpoints(&self) -> &[ScrapeEndpoint] {
        match self {
            MonitoringResource::Pod(pm) => &pm.spec.endpoints,
            MonitoringResource::Cluster(cpm) => &cpm.spec.endpoints,
        }
    }

    pub fn status(&self) -> Option<&MonitoringStatus> {
        match self {
            MonitoringResource::Pod(pm) => pm.status.as_ref(),
            MonitoringResource::Cluster(cpm) => cpm.status.as_ref(),
        }
    }

    pub fn endpoint_statuses(&self) -> &[ScrapeEndpointStatus] {
        self.status()
            .map(|status| status.endpoint_statuses.as_slice())
            .unwrap_or_default()
    }

    /// Replaces the endpoint statuses wholesale, creating the status if absent.
    pub fn set_endpoint_statuses(&mut self, endpoint_statuses: Vec<ScrapeEndpointStatus>) {
        let status = match self {
            MonitoringResource::Pod(pm) => pm.status.get_or_insert_with(MonitoringStatus::default),
            MonitoringResource::Cluster(cpm) => cpm.status.get_or_insert_with(MonitoringStatus::default),
        };
        status.endpoint_statuses = endpoint_statuses;
    }

    /// Identity of the resource, failing if required metadata is missing
    pub fn key(&self) -> Result<ResourceKey, ResourceError> {
        let kind = self.kind();
        let name = self.name().ok_or(ResourceError::MissingName(kind))?;
        let namespace = if kind.is_namespaced() {
            let namespace = self.namespace().ok_or_else(|| ResourceError::MissingNamespace {
                kind,
                name: name.to_string(),
            })?;
            Some(namespace.to_string())
        } else {
            None
        };
        Ok(ResourceKey {
            kind,
            namespace,
            name: name.to_string(),
        })
    }
}

impl From<PodMonitoring> for MonitoringResource {
    fn from(pm: PodMonitoring) -> Self {
        MonitoringResource::Pod(pm)
    }
}

impl From<ClusterPodMonitoring> for MonitoringResource {
    fn from(cpm: ClusterPodMonitoring) -> Self {
        MonitoringResource::Cluster(cpm)
    }
}
