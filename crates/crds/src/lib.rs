//! Monitoring CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the target status controller:
//! the namespaced `PodMonitoring`, the cluster-scoped `ClusterPodMonitoring`,
//! and the endpoint status types the controller writes back onto both.

pub mod endpoint;
pub mod status;
pub mod pod_monitoring;
pub mod cluster_pod_monitoring;
pub mod resource;

pub use endpoint::*;
pub use status::*;
pub use pod_monitoring::*;
pub use cluster_pod_monitoring::*;
pub use resource::*;

/// API group shared by all monitoring CRDs
pub const MONITORING_API_GROUP: &str = "monitoring.microscaler.io";
