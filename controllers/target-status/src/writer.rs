//! Status writer.
//!
//! Commits aggregated endpoint statuses onto the monitoring resources. Each
//! write is a read-modify-write of the status subresource guarded by the
//! object's `resourceVersion`, so a concurrent writer makes the write fail
//! instead of being silently overwritten.

use crate::aggregator::StatusUpdate;
use crate::error::{ControllerError, WriteFailure};
use crds::{
    ClusterPodMonitoring, MonitoringKind, MonitoringResource, PodMonitoring, ResourceError, ResourceKey,
};
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Access to the monitoring resources in the cluster
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    /// All PodMonitorings (every namespace) and ClusterPodMonitorings
    async fn list(&self) -> Result<Vec<MonitoringResource>, ControllerError>;

    /// Current state of one resource
    async fn get(&self, key: &ResourceKey) -> Result<MonitoringResource, ControllerError>;

    /// Persist the resource's status, failing if its resource version is stale
    async fn update_status(&self, resource: &MonitoringResource) -> Result<(), ControllerError>;
}

/// `ResourceStore` backed by the Kubernetes API
pub struct KubeResourceStore {
    client: Client,
}

impl KubeResourceStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pod_monitorings(&self, namespace: &str) -> Api<PodMonitoring> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn cluster_pod_monitorings(&self) -> Api<ClusterPodMonitoring> {
        Api::all(self.client.clone())
    }
}

fn namespace_of(key: &ResourceKey) -> Result<&str, ControllerError> {
    key.namespace.as_deref().ok_or_else(|| {
        ResourceError::MissingNamespace {
            kind: key.kind,
            name: key.name.clone(),
        }
        .into()
    })
}

#[async_trait::async_trait]
impl ResourceStore for KubeResourceStore {
    async fn list(&self) -> Result<Vec<MonitoringResource>, ControllerError> {
        let pod_monitorings = Api::<PodMonitoring>::all(self.client.clone())
            .list(&ListParams::default())
            .await?;
        let cluster_pod_monitorings = self.cluster_pod_monitorings().list(&ListParams::default()).await?;

        Ok(pod_monitorings
            .items
            .into_iter()
            .map(MonitoringResource::from)
            .chain(cluster_pod_monitorings.items.into_iter().map(MonitoringResource::from))
            .collect())
    }

    async fn get(&self, key: &ResourceKey) -> Result<MonitoringResource, ControllerError> {
        let resource: MonitoringResource = match key.kind {
            MonitoringKind::PodMonitoring => {
                self.pod_monitorings(namespace_of(key)?).get(&key.name).await?.into()
            }
            MonitoringKind::ClusterPodMonitoring => {
                self.cluster_pod_monitorings().get(&key.name).await?.into()
            }
        };
        Ok(resource)
    }

    async fn update_status(&self, resource: &MonitoringResource) -> Result<(), ControllerError> {
        let key = resource.key()?;
        // Merge patch with resourceVersion set is rejected with 409 on conflict
        let patch = json!({
            "metadata": { "resourceVersion": resource.resource_version() },
            "status": { "endpointStatuses": resource.endpoint_statuses() },
        });
        let params = PatchParams::default();

        match key.kind {
            MonitoringKind::PodMonitoring => {
                self.pod_monitorings(namespace_of(&key)?)
                    .patch_status(&key.name, &params, &Patch::Merge(&patch))
                    .await?;
            }
            MonitoringKind::ClusterPodMonitoring => {
                self.cluster_pod_monitorings()
                    .patch_status(&key.name, &params, &Patch::Merge(&patch))
                    .await?;
            }
        }
        Ok(())
    }
}

/// Writes status updates through a `ResourceStore`
pub struct StatusWriter {
    store: Arc<dyn ResourceStore>,
}

impl StatusWriter {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Replace one resource's endpoint statuses wholesale
    pub async fn write(&self, update: &StatusUpdate) -> Result<(), ControllerError> {
        let mut resource = self.store.get(&update.key).await?;
        resource.set_endpoint_statuses(update.endpoint_statuses.clone());
        self.store.update_status(&resource).await?;
        debug!(
            resource = %update.key,
            endpoints = update.endpoint_statuses.len(),
            "Updated endpoint statuses"
        );
        Ok(())
    }

    /// Attempt every update, returning how many were written.
    ///
    /// A failed update does not stop the others; all failures are reported
    /// together as `ControllerError::StatusWrite`. Once `cancel` fires no
    /// further update is started and the call returns `Cancelled`; updates
    /// already committed stay.
    pub async fn write_all(
        &self,
        updates: &[StatusUpdate],
        cancel: &CancellationToken,
    ) -> Result<usize, ControllerError> {
        let mut failures = Vec::new();
        for (i, update) in updates.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(
                    written = i - failures.len(),
                    skipped = updates.len() - i,
                    "Status writes cancelled"
                );
                return Err(ControllerError::Cancelled);
            }
            if let Err(error) = self.write(update).await {
                warn!(resource = %update.key, error = %error, "Failed to update endpoint statuses");
                failures.push(WriteFailure {
                    key: update.key.clone(),
                    error,
                });
            }
        }

        let written = updates.len() - failures.len();
        if failures.is_empty() {
            info!(written, "Endpoint statuses written");
            Ok(written)
        } else {
            Err(ControllerError::StatusWrite(failures))
        }
    }
}
