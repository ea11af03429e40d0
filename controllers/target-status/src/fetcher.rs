//! Collector fleet fetcher.
//!
//! Polls every collector pod for its active targets through a fixed pool of
//! worker tasks. A collector that fails to answer contributes `None`; the
//! aggregator turns the share of `None`s into the collectors fraction.

use crate::discovery::CollectorPod;
use crate::error::ControllerError;
use collector_client::TargetsResult;
use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result of polling one collector; `None` means the poll failed.
pub type RawFetchResult = Option<TargetsResult>;

/// Fetch the targets of every pod with at most `concurrency` fetches in flight.
///
/// Returns exactly one entry per pod, in no particular order. Returns an empty
/// vector without doing any work if `concurrency` is 0 or `pods` is empty.
/// Fails only with `ControllerError::Cancelled` once `cancel` fires, or
/// `ControllerError::FetchWorker` if a worker task panics.
pub async fn fetch_all<F, Fut, E>(
    pods: Vec<CollectorPod>,
    fetch: F,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<Vec<RawFetchResult>, ControllerError>
where
    F: Fn(CollectorPod) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TargetsResult, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    if concurrency == 0 || pods.is_empty() {
        return Ok(Vec::new());
    }

    let total = pods.len();
    let workers = concurrency.min(total);
    debug!(pods = total, workers, "Fetching targets from collectors");

    let queue = Arc::new(Mutex::new(VecDeque::from(pods)));
    let fetch = Arc::new(fetch);
    let mut tasks = JoinSet::new();

    for _ in 0..workers {
        let queue = queue.clone();
        let fetch = fetch.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let mut results = Vec::new();
            loop {
                if cancel.is_cancelled() {
                    return Err(ControllerError::Cancelled);
                }
                let Some(pod) = queue.lock().await.pop_front() else {
                    break;
                };
                let pod_name = pod.name.clone();
                tokio::select! {
                    _ = cancel.cancelled() => return Err(ControllerError::Cancelled),
                    result = fetch(pod) => match result {
                        Ok(targets) => results.push(Some(targets)),
                        Err(e) => {
                            warn!(pod = %pod_name, error = %e, "Failed to fetch targets from collector");
                            results.push(None);
                        }
                    },
                }
            }
            Ok::<_, ControllerError>(results)
        });
    }

    let mut all = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        let worker_result = match joined {
            Ok(result) => result,
            Err(e) => Err(ControllerError::FetchWorker(e.to_string())),
        };
        match worker_result {
            Ok(results) => all.extend(results),
            Err(e) => {
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_client::{
        ActiveTarget, CollectorClientTrait, CollectorError, MockCollectorClient, TargetHealth,
    };
    use futures::future::{BoxFuture, FutureExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const CONCURRENCY: usize = 4;

    fn pods(n: usize) -> Vec<CollectorPod> {
        (0..n)
            .map(|i| CollectorPod::new(format!("collector-{}", i), format!("10.0.0.{}", i), 19090))
            .collect()
    }

    fn mock_fetch(
        client: MockCollectorClient,
    ) -> impl Fn(CollectorPod) -> BoxFuture<'static, Result<TargetsResult, CollectorError>> + Send + Sync + 'static {
        move |pod: CollectorPod| {
            let client = client.clone();
            async move { client.get_targets(&pod.ip, pod.port).await }.boxed()
        }
    }

    #[tokio::test]
    async fn test_one_result_per_pod() {
        for n in [0, 1, 2, CONCURRENCY - 1, CONCURRENCY, CONCURRENCY + 1, 3 * CONCURRENCY] {
            let client = MockCollectorClient::new();
            for (i, pod) in pods(n).iter().enumerate() {
                let result = TargetsResult {
                    active: vec![ActiveTarget::new(format!("PodMonitoring/ns/app/{}", i), TargetHealth::Up)],
                };
                client.set_targets(&pod.ip, pod.port, result);
            }

            let results = fetch_all(pods(n), mock_fetch(client), CONCURRENCY, &CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(results.len(), n, "pod count {}", n);
            assert!(results.iter().all(Option::is_some));

            let mut pools: Vec<String> = results
                .into_iter()
                .flatten()
                .map(|r| r.active[0].scrape_pool.clone())
                .collect();
            pools.sort();
            let mut expected: Vec<String> = (0..n).map(|i| format!("PodMonitoring/ns/app/{}", i)).collect();
            expected.sort();
            assert_eq!(pools, expected);
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_yields_none() {
        let client = MockCollectorClient::new();
        let all = pods(5);
        for pod in all.iter().take(2) {
            client.set_targets(&pod.ip, pod.port, TargetsResult::default());
        }

        let results = fetch_all(all, mock_fetch(client), CONCURRENCY, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 5);
        assert_eq!(results.iter().filter(|r| r.is_none()).count(), 3);
    }

    #[tokio::test]
    async fn test_zero_concurrency_does_nothing() {
        let client = MockCollectorClient::new();
        let results = fetch_all(pods(3), mock_fetch(client.clone()), 0, &CancellationToken::new())
            .await
            .unwrap();
        assert!(results.is_empty());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let fetch = {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            move |_pod: CollectorPod| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(TargetsResult::default())
                }
            }
        };

        let results = fetch_all(pods(3 * CONCURRENCY), fetch, CONCURRENCY, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 3 * CONCURRENCY);
        assert!(peak.load(Ordering::SeqCst) <= CONCURRENCY);
    }

    #[tokio::test]
    async fn test_cancellation_abandons_fetches() {
        let cancel = CancellationToken::new();
        let fetch = |_pod: CollectorPod| async {
            futures::future::pending::<()>().await;
            Ok::<_, String>(TargetsResult::default())
        };

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = fetch_all(pods(2), fetch, CONCURRENCY, &cancel).await;
        assert!(matches!(result, Err(ControllerError::Cancelled)));
    }
}
