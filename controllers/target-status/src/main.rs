//! Target Status Controller
//!
//! Periodically polls every metrics collector for the targets it scrapes and
//! writes a per-endpoint health summary onto the owning resources:
//! - PodMonitoring: namespaced scrape configuration
//! - ClusterPodMonitoring: cluster-wide scrape configuration

mod aggregator;
mod clock;
mod config;
mod controller;
mod discovery;
mod error;
mod fetcher;
mod reconciler;
mod scheduler;
mod scrape_pool;
mod watcher;
mod writer;
#[cfg(test)]
mod test_utils;

use config::ControllerConfig;
use controller::Controller;
use crate::error::ControllerError;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Target Status Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace);
    info!("  Collector: {} (port {})", config.collector_name, config.collector_port_name);
    info!("  Poll interval: {:?}", config.poll_interval);
    info!("  Concurrency: {}", config.concurrency);
    info!("  Fetch timeout: {:?}", config.fetch_timeout);

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
