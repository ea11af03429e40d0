//! Test utilities for unit testing the controller
//!
//! This module provides helpers for creating test data and in-memory
//! stand-ins for the cluster, the collectors and the clock.

use crate::clock::Clock;
use crate::discovery::{CollectorDiscovery, CollectorPod};
use crate::error::ControllerError;
use crate::writer::ResourceStore;
use chrono::{DateTime, TimeZone, Utc};
use collector_client::{ActiveTarget, TargetHealth};
use crds::*;
use k8s_openapi::api::apps::v1::{DaemonSet, DaemonSetSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, ContainerStatus, Pod, PodSpec, PodStatus, PodTemplateSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Fixed observation time used across tests
pub fn test_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 1, 4, 0, 0, 0).unwrap()
}

/// Yield to other tasks until `condition` holds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

/// Helper to create test PodMonitoring CRD
pub fn create_test_pod_monitoring(namespace: &str, name: &str, ports: &[&str]) -> PodMonitoring {
    PodMonitoring {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: PodMonitoringSpec {
            endpoints: ports.iter().map(|port| ScrapeEndpoint::named(*port)).collect(),
            ..Default::default()
        },
        status: None,
    }
}

/// Helper to create test ClusterPodMonitoring CRD
pub fn create_test_cluster_pod_monitoring(name: &str, ports: &[&str]) -> ClusterPodMonitoring {
    ClusterPodMonitoring {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: ClusterPodMonitoringSpec {
            endpoints: ports.iter().map(|port| ScrapeEndpoint::named(*port)).collect(),
            ..Default::default()
        },
        status: None,
    }
}

/// Helper to create an active target with a single `instance` label
pub fn create_test_target(
    scrape_pool: &str,
    health: TargetHealth,
    last_error: &str,
    instance: &str,
    duration: f64,
) -> ActiveTarget {
    ActiveTarget::new(scrape_pool, health)
        .with_label("instance", instance)
        .with_error(last_error)
        .with_duration(duration)
}

/// Helper to create an endpoint status with `active` healthy targets
pub fn create_test_status(name: &str, active: i64) -> ScrapeEndpointStatus {
    ScrapeEndpointStatus {
        name: name.to_string(),
        active_targets: active,
        unhealthy_targets: 0,
        last_update_time: test_time(),
        sample_groups: Vec::new(),
        collectors_fraction: "1".to_string(),
    }
}

/// Helper to create a collector DaemonSet exposing one named port
pub fn create_test_collector_daemonset(name: &str, port_name: &str, port: i32) -> DaemonSet {
    let labels = BTreeMap::from([("app.kubernetes.io/name".to_string(), name.to_string())]);
    DaemonSet {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("monitoring-system".to_string()),
            ..Default::default()
        },
        spec: Some(DaemonSetSpec {
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![
                        Container {
                            name: "config-reloader".to_string(),
                            ..Default::default()
                        },
                        Container {
                            name: "prometheus".to_string(),
                            ports: Some(vec![ContainerPort {
                                name: Some(port_name.to_string()),
                                container_port: port,
                                ..Default::default()
                            }]),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

/// Helper to create a collector pod in the given phase
pub fn create_test_collector_pod(name: &str, phase: &str, ip: Option<&str>, ready: bool) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("monitoring-system".to_string()),
            ..Default::default()
        },
        spec: None,
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            pod_ip: ip.map(|s| s.to_string()),
            container_statuses: Some(vec![ContainerStatus {
                name: "prometheus".to_string(),
                ready,
                ..Default::default()
            }]),
            ..Default::default()
        }),
    }
}

/// Clock that only moves when stepped
#[derive(Debug)]
pub struct FakeClock {
    inner: Mutex<FakeClockInner>,
}

#[derive(Debug)]
struct FakeClockInner {
    now: DateTime<Utc>,
    sleepers: Vec<(DateTime<Utc>, oneshot::Sender<()>)>,
}

impl FakeClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(FakeClockInner {
                now,
                sleepers: Vec::new(),
            }),
        }
    }

    /// Advance time, waking every sleeper whose deadline has passed
    pub fn step(&self, duration: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.now = inner.now + chrono::Duration::from_std(duration).unwrap();
        let now = inner.now;
        let (due, waiting): (Vec<_>, Vec<_>) =
            inner.sleepers.drain(..).partition(|(deadline, _)| *deadline <= now);
        inner.sleepers = waiting;
        for (_, waker) in due {
            let _ = waker.send(());
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.lock().unwrap().now
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().unwrap();
        let deadline = inner.now + chrono::Duration::from_std(duration).unwrap();
        if deadline <= inner.now {
            let _ = tx.send(());
        } else {
            inner.sleepers.push((deadline, tx));
        }
        Box::pin(async move {
            let _ = rx.await;
        })
    }
}

/// Discovery that always returns the same pods
pub struct StaticDiscovery {
    pods: Vec<CollectorPod>,
}

impl StaticDiscovery {
    pub fn new(pods: Vec<CollectorPod>) -> Self {
        Self { pods }
    }
}

#[async_trait::async_trait]
impl CollectorDiscovery for StaticDiscovery {
    async fn collector_pods(&self) -> Result<Vec<CollectorPod>, ControllerError> {
        Ok(self.pods.clone())
    }
}

/// In-memory `ResourceStore` with resource version checks
#[derive(Default)]
pub struct MemoryResourceStore {
    resources: Mutex<HashMap<ResourceKey, MonitoringResource>>,
    failing: Mutex<HashSet<ResourceKey>>,
    updates: Mutex<usize>,
    cancel_on_update: Mutex<Option<CancellationToken>>,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, resource: MonitoringResource) {
        let key = resource.key().unwrap();
        self.resources.lock().unwrap().insert(key, resource);
    }

    pub fn stored(&self, key: &ResourceKey) -> Option<MonitoringResource> {
        self.resources.lock().unwrap().get(key).cloned()
    }

    /// Make every status update of `key` fail with a conflict
    pub fn fail_updates_for(&self, key: ResourceKey) {
        self.failing.lock().unwrap().insert(key);
    }

    /// Cancel `token` as soon as a status update commits
    pub fn cancel_on_update(&self, token: CancellationToken) {
        *self.cancel_on_update.lock().unwrap() = Some(token);
    }

    /// Number of committed status updates
    pub fn update_count(&self) -> usize {
        *self.updates.lock().unwrap()
    }
}

fn bump_version(resource: &mut MonitoringResource) {
    let meta = match resource {
        MonitoringResource::Pod(pm) => &mut pm.metadata,
        MonitoringResource::Cluster(cpm) => &mut cpm.metadata,
    };
    let next = meta
        .resource_version
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    meta.resource_version = Some(next.to_string());
}

#[async_trait::async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn list(&self) -> Result<Vec<MonitoringResource>, ControllerError> {
        let mut resources: Vec<MonitoringResource> =
            self.resources.lock().unwrap().values().cloned().collect();
        resources.sort_by_key(|r| r.key().unwrap());
        Ok(resources)
    }

    async fn get(&self, key: &ResourceKey) -> Result<MonitoringResource, ControllerError> {
        self.stored(key)
            .ok_or_else(|| ControllerError::InvalidInput(format!("{} not found", key)))
    }

    async fn update_status(&self, resource: &MonitoringResource) -> Result<(), ControllerError> {
        let key = resource.key()?;
        if self.failing.lock().unwrap().contains(&key) {
            return Err(ControllerError::InvalidInput(format!("{} conflict", key)));
        }

        let mut resources = self.resources.lock().unwrap();
        let current = resources
            .get_mut(&key)
            .ok_or_else(|| ControllerError::InvalidInput(format!("{} not found", key)))?;
        if current.resource_version() != resource.resource_version() {
            return Err(ControllerError::InvalidInput(format!("{} conflict", key)));
        }
        current.set_endpoint_statuses(resource.endpoint_statuses().to_vec());
        bump_version(current);
        *self.updates.lock().unwrap() += 1;
        if let Some(token) = self.cancel_on_update.lock().unwrap().as_ref() {
            token.cancel();
        }
        Ok(())
    }
}
