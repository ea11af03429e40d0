//! PodMonitoring CRD
//!
//! Declares scrape endpoints for pods in the resource's own namespace.

use crate::endpoint::{PodSelector, ScrapeEndpoint};
use crate::status::MonitoringStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "monitoring.microscaler.io",
    version = "v1",
    kind = "PodMonitoring",
    namespaced,
    status = "MonitoringStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PodMonitoringSpec {
    /// Pods to scrape, restricted to the PodMonitoring's namespace
    #[serde(default)]
    pub selector: PodSelector,

    /// Scrape endpoints, in declaration order
    #[serde(default)]
    pub endpoints: Vec<ScrapeEndpoint>,
}
