//! ClusterPodMonitoring CRD
//!
//! Cluster-scoped variant of PodMonitoring that selects pods in every namespace.

use crate::endpoint::{PodSelector, ScrapeEndpoint};
use crate::status::MonitoringStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "monitoring.microscaler.io",
    version = "v1",
    kind = "ClusterPodMonitoring",
    status = "MonitoringStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPodMonitoringSpec {
    /// Pods to scrape across all namespaces
    #[serde(default)]
    pub selector: PodSelector,

    /// Scrape endpoints, in declaration order
    #[serde(default)]
    pub endpoints: Vec<ScrapeEndpoint>,
}
