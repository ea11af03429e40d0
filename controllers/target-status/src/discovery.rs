//! Collector pod discovery.
//!
//! Collectors run as a DaemonSet in the operator namespace. Every running,
//! ready collector pod with an IP is polled on the container port that serves
//! the target API.

use crate::error::ControllerError;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::debug;

/// A collector pod that can be polled for targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorPod {
    pub name: String,
    pub ip: String,
    pub port: i32,
}

impl CollectorPod {
    pub fn new(name: impl Into<String>, ip: impl Into<String>, port: i32) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
            port,
        }
    }
}

/// Source of the collector pods to poll
#[async_trait::async_trait]
pub trait CollectorDiscovery: Send + Sync {
    async fn collector_pods(&self) -> Result<Vec<CollectorPod>, ControllerError>;
}

/// Discovers collector pods through the collector DaemonSet
pub struct KubeCollectorDiscovery {
    daemonsets: Api<DaemonSet>,
    pods: Api<Pod>,
    collector_name: String,
    port_name: String,
}

impl KubeCollectorDiscovery {
    pub fn new(client: Client, namespace: &str, collector_name: &str, port_name: &str) -> Self {
        Self {
            daemonsets: Api::namespaced(client.clone(), namespace),
            pods: Api::namespaced(client, namespace),
            collector_name: collector_name.to_string(),
            port_name: port_name.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl CollectorDiscovery for KubeCollectorDiscovery {
    async fn collector_pods(&self) -> Result<Vec<CollectorPod>, ControllerError> {
        let ds = self.daemonsets.get(&self.collector_name).await?;
        let port = collector_port(&ds, &self.port_name)?;
        let selector = label_selector(&ds)?;

        let pods = self.pods.list(&ListParams::default().labels(&selector)).await?;
        let ready = ready_collector_pods(&pods.items, port);
        debug!(
            listed = pods.items.len(),
            ready = ready.len(),
            selector = %selector,
            "Discovered collector pods"
        );
        Ok(ready)
    }
}

/// Container port named `port_name` in the DaemonSet's pod template
pub fn collector_port(ds: &DaemonSet, port_name: &str) -> Result<i32, ControllerError> {
    ds.spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .into_iter()
        .flat_map(|pod_spec| pod_spec.containers.iter())
        .flat_map(|container| container.ports.iter().flatten())
        .find(|port| port.name.as_deref() == Some(port_name))
        .map(|port| port.container_port)
        .ok_or_else(|| {
            ControllerError::InvalidConfig(format!(
                "collector DaemonSet {} has no container port named {}",
                ds.metadata.name.as_deref().unwrap_or("<unknown>"),
                port_name
            ))
        })
}

/// Label selector string for the DaemonSet's pod selector
///
/// `matchLabels` become `k=v` terms and `matchExpressions` become set-based
/// terms (`k in (a,b)`, `k notin (a,b)`, `k`, `!k`).
pub fn label_selector(ds: &DaemonSet) -> Result<String, ControllerError> {
    let ds_name = || ds.metadata.name.as_deref().unwrap_or("<unknown>").to_string();
    let selector = ds.spec.as_ref().map(|spec| &spec.selector);

    let mut terms: Vec<String> = selector
        .and_then(|s| s.match_labels.as_ref())
        .into_iter()
        .flatten()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    for expr in selector.and_then(|s| s.match_expressions.as_ref()).into_iter().flatten() {
        let values = expr.values.as_deref().unwrap_or_default().join(",");
        let term = match expr.operator.as_str() {
            "In" => format!("{} in ({})", expr.key, values),
            "NotIn" => format!("{} notin ({})", expr.key, values),
            "Exists" => expr.key.clone(),
            "DoesNotExist" => format!("!{}", expr.key),
            other => {
                return Err(ControllerError::InvalidConfig(format!(
                    "collector DaemonSet {} has unsupported selector operator {}",
                    ds_name(),
                    other
                )));
            }
        };
        terms.push(term);
    }

    if terms.is_empty() {
        return Err(ControllerError::InvalidConfig(format!(
            "collector DaemonSet {} has an empty pod selector",
            ds_name()
        )));
    }
    Ok(terms.join(","))
}

/// Running pods with an IP whose containers are all ready
pub fn ready_collector_pods(pods: &[Pod], port: i32) -> Vec<CollectorPod> {
    pods.iter()
        .filter_map(|pod| {
            let name = pod.metadata.name.as_deref()?;
            let status = pod.status.as_ref()?;
            if status.phase.as_deref() != Some("Running") {
                return None;
            }
            let ip = status.pod_ip.as_deref().filter(|ip| !ip.is_empty())?;
            let statuses = status.container_statuses.as_deref().unwrap_or_default();
            if statuses.is_empty() || !statuses.iter().all(|c| c.ready) {
                return None;
            }
            Some(CollectorPod::new(name, ip, port))
        })
        .collect()
}
