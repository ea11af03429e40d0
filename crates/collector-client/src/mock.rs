//! Mock CollectorClient for unit testing
//!
//! Serves target lists from memory, keyed by `ip:port`, and can be reconfigured
//! between polls to simulate targets changing health.

use crate::error::CollectorError;
use crate::models::TargetsResult;
use crate::collector_trait::CollectorClientTrait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock CollectorClient for testing
///
/// Unknown addresses answer with `CollectorError::NotFound`, which callers
/// treat like any other failed collector.
#[derive(Clone, Default, Debug)]
pub struct MockCollectorClient {
    pub(crate) targets: Arc<Mutex<HashMap<String, TargetsResult>>>,
    pub(crate) requests: Arc<Mutex<Vec<String>>>,
}

impl MockCollectorClient {
    /// Create a new mock client with no collectors
    pub fn new() -> Self {
        Self::default()
    }

    /// Key under which a collector's targets are stored
    pub fn key(pod_ip: &str, port: i32) -> String {
        format!("{}:{}", pod_ip, port)
    }

    /// Set (or replace) the targets served by a collector
    pub fn set_targets(&self, pod_ip: &str, port: i32, result: TargetsResult) {
        self.targets.lock().unwrap().insert(Self::key(pod_ip, port), result);
    }

    /// Make a collector unreachable
    pub fn remove_targets(&self, pod_ip: &str, port: i32) {
        self.targets.lock().unwrap().remove(&Self::key(pod_ip, port));
    }

    /// Addresses requested so far, in request order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CollectorClientTrait for MockCollectorClient {
    async fn get_targets(&self, pod_ip: &str, port: i32) -> Result<TargetsResult, CollectorError> {
        let key = Self::key(pod_ip, port);
        self.requests.lock().unwrap().push(key.clone());
        self.targets
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| CollectorError::NotFound(format!("Pod target does not exist: {}", key)))
    }
}
