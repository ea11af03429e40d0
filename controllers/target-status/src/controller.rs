//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the collector
//! watcher to the poll scheduler and supervises both tasks.

use crate::clock::{Clock, SystemClock};
use crate::config::ControllerConfig;
use crate::discovery::KubeCollectorDiscovery;
use crate::error::ControllerError;
use crate::reconciler::TargetStatusReconciler;
use crate::scheduler::PollScheduler;
use crate::watcher::{watch_collectors, TriggerContext};
use crate::writer::KubeResourceStore;
use collector_client::CollectorClient;
use k8s_openapi::api::apps::v1::DaemonSet;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Main controller for target status reconciliation.
pub struct Controller {
    watcher: JoinHandle<Result<(), ControllerError>>,
    scheduler: JoinHandle<Result<(), ControllerError>>,
    cancel: CancellationToken,
}

impl Controller {
    /// Creates a new controller instance and starts its tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        config.validate()?;

        let client = Client::try_default().await?;
        info!("Kubernetes client initialized");

        let collector = Arc::new(CollectorClient::new(config.fetch_timeout)?);
        let discovery = Arc::new(KubeCollectorDiscovery::new(
            client.clone(),
            &config.namespace,
            &config.collector_name,
            &config.collector_port_name,
        ));
        let store = Arc::new(KubeResourceStore::new(client.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let reconciler = Arc::new(TargetStatusReconciler::new(
            discovery,
            collector,
            store,
            clock.clone(),
            config.concurrency,
        ));

        let cancel = CancellationToken::new();
        // One queued trigger is enough; further ones coalesce
        let (triggers_tx, triggers_rx) = mpsc::channel(1);

        let scheduler = PollScheduler::new(reconciler, clock, config.poll_interval, cancel.clone());
        let scheduler = tokio::spawn(scheduler.run(triggers_rx));

        let daemonsets: Api<DaemonSet> = Api::namespaced(client, &config.namespace);
        let ctx = Arc::new(TriggerContext::new(triggers_tx, config.poll_interval));
        let collector_name = config.collector_name.clone();
        let watcher = tokio::spawn(async move {
            watch_collectors(daemonsets, &collector_name, ctx).await
        });

        Ok(Self {
            watcher,
            scheduler,
            cancel,
        })
    }

    /// Runs until shutdown is requested or a task stops.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Target status controller running");

        tokio::select! {
            result = &mut self.watcher => {
                self.cancel.cancel();
                result.map_err(|e| ControllerError::Watch(format!("Collector watcher panicked: {}", e)))??;
                warn!("Collector watcher stopped");
            }
            result = &mut self.scheduler => {
                self.watcher.abort();
                result.map_err(|e| ControllerError::Watch(format!("Poll scheduler panicked: {}", e)))??;
                warn!("Poll scheduler stopped");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                self.cancel.cancel();
                self.watcher.abort();
                self.scheduler
                    .await
                    .map_err(|e| ControllerError::Watch(format!("Poll scheduler panicked: {}", e)))??;
            }
        }

        Ok(())
    }
}
