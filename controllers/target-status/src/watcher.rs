//! Collector DaemonSet watcher.
//!
//! Any change to the collector DaemonSet (rollouts, scaling to new nodes)
//! requests a poll cycle. Each reconcile requeues after the poll interval, so
//! polls keep being requested while the fleet is stable.

use crate::error::ControllerError;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::DaemonSet;
use kube::Api;
use kube_runtime::{Controller, watcher, controller::{Action, Config as RuntimeConfig}};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info};

/// Shared state of the DaemonSet reconcile loop
#[derive(Debug)]
pub struct TriggerContext {
    triggers: mpsc::Sender<()>,
    resync: Duration,
}

impl TriggerContext {
    pub fn new(triggers: mpsc::Sender<()>, resync: Duration) -> Self {
        Self { triggers, resync }
    }

    /// Queue a poll request. A full channel already holds one, which is enough.
    pub fn request_poll(&self) -> Result<(), ControllerError> {
        match self.triggers.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => Ok(()),
            Err(TrySendError::Closed(())) => Err(ControllerError::Watch(
                "poll trigger channel closed".to_string(),
            )),
        }
    }
}

async fn reconcile(ds: Arc<DaemonSet>, ctx: Arc<TriggerContext>) -> Result<Action, ControllerError> {
    debug!(
        daemonset = ds.metadata.name.as_deref().unwrap_or("<unknown>"),
        "Requesting poll for collector DaemonSet"
    );
    ctx.request_poll()?;
    Ok(Action::requeue(ctx.resync))
}

fn error_policy(ds: Arc<DaemonSet>, error: &ControllerError, ctx: Arc<TriggerContext>) -> Action {
    error!(
        daemonset = ds.metadata.name.as_deref().unwrap_or("<unknown>"),
        error = %error,
        "Collector DaemonSet reconciliation failed"
    );
    Action::requeue(ctx.resync)
}

/// Watch the collector DaemonSet until the watch stream ends.
pub async fn watch_collectors(
    api: Api<DaemonSet>,
    collector_name: &str,
    ctx: Arc<TriggerContext>,
) -> Result<(), ControllerError> {
    info!("Starting collector DaemonSet watcher for {}", collector_name);

    let watch_config = watcher::Config::default().fields(&format!("metadata.name={}", collector_name));
    // Debounce bursts of DaemonSet status updates during rollouts
    let runtime_config = RuntimeConfig::default().debounce(Duration::from_secs(1));

    Controller::new(api, watch_config)
        .with_config(runtime_config)
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            if let Err(e) = res {
                error!("Controller error for collector DaemonSet: {}", e);
            }
        })
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_poll_tolerates_full_channel() {
        let (tx, mut rx) = mpsc::channel(1);
        let ctx = TriggerContext::new(tx, Duration::from_secs(10));

        ctx.request_poll().unwrap();
        ctx.request_poll().unwrap();

        assert_eq!(rx.recv().await, Some(()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_request_poll_fails_when_scheduler_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let ctx = TriggerContext::new(tx, Duration::from_secs(10));

        assert!(matches!(ctx.request_poll(), Err(ControllerError::Watch(_))));
    }
}
