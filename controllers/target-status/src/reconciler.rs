//! Poll cycle reconciler.
//!
//! One cycle discovers the collectors, polls all of them, aggregates what
//! they report against the current monitoring resources and writes the
//! resulting statuses.

use crate::aggregator::aggregate;
use crate::clock::Clock;
use crate::discovery::{CollectorDiscovery, CollectorPod};
use crate::error::ControllerError;
use crate::fetcher::fetch_all;
use crate::scheduler::{CycleReport, PollCycle};
use crate::writer::{ResourceStore, StatusWriter};
use collector_client::CollectorClientTrait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Reconciles target status for all monitoring resources.
pub struct TargetStatusReconciler {
    discovery: Arc<dyn CollectorDiscovery>,
    collector: Arc<dyn CollectorClientTrait>,
    store: Arc<dyn ResourceStore>,
    writer: StatusWriter,
    clock: Arc<dyn Clock>,
    concurrency: usize,
}

impl TargetStatusReconciler {
    pub fn new(
        discovery: Arc<dyn CollectorDiscovery>,
        collector: Arc<dyn CollectorClientTrait>,
        store: Arc<dyn ResourceStore>,
        clock: Arc<dyn Clock>,
        concurrency: usize,
    ) -> Self {
        Self {
            discovery,
            collector,
            writer: StatusWriter::new(store.clone()),
            store,
            clock,
            concurrency,
        }
    }
}

#[async_trait::async_trait]
impl PollCycle for TargetStatusReconciler {
    async fn run_cycle(&self, cancel: CancellationToken) -> Result<CycleReport, ControllerError> {
        let pods = self.discovery.collector_pods().await?;
        let pod_count = pods.len();
        debug!(pods = pod_count, "Polling collectors");

        let collector = self.collector.clone();
        let fetch = move |pod: CollectorPod| {
            let collector = collector.clone();
            async move { collector.get_targets(&pod.ip, pod.port).await }
        };
        let results = fetch_all(pods, fetch, self.concurrency, &cancel).await?;
        let observed_at = self.clock.now();
        let present = results.iter().filter(|r| r.is_some()).count();

        let resources = self.store.list().await?;
        let updates = aggregate(observed_at, &resources, &results)?;

        let written = self.writer.write_all(&updates, &cancel).await?;
        if present < pod_count {
            info!(
                answered = present,
                pods = pod_count,
                "Not all collectors answered, statuses reflect partial data"
            );
        }

        Ok(CycleReport {
            pods: pod_count,
            results: present,
            written,
        })
    }
}
