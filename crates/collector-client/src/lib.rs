//! Collector Target API Client
//!
//! A client for the Prometheus-compatible target API served by every metrics
//! collector pod. The controller polls each collector with it to learn which
//! targets the collector scrapes and how healthy they are.
//!
//! # Example
//!
//! ```no_run
//! use collector_client::CollectorClient;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CollectorClient::new(Duration::from_secs(5))?;
//! let targets = client.get_targets("10.0.0.7", 19090).await?;
//! for target in &targets.active {
//!     println!("{} {}", target.scrape_pool, target.health);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod collector_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::CollectorClient;
pub use error::CollectorError;
pub use models::*;
pub use collector_trait::CollectorClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockCollectorClient;
