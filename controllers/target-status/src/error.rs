//! Controller-specific error types.
//!
//! This module defines error types specific to the Target Status Controller
//! that are not covered by upstream library errors.

use collector_client::CollectorError;
use crds::{ResourceError, ResourceKey};
use kube::Error as KubeError;
use std::fmt;
use thiserror::Error;

/// Errors that can occur in the Target Status Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Collector API error
    #[error("Collector error: {0}")]
    Collector(#[from] CollectorError),

    /// One or more status writes failed; successful writes are kept
    #[error("Status write failed for {} resource(s): {}", .0.len(), WriteFailures(.0))]
    StatusWrite(Vec<WriteFailure>),

    /// Structurally invalid monitoring resource
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A fetch worker task died before reporting its results
    #[error("Fetch worker failed: {0}")]
    FetchWorker(String),

    /// Work abandoned because shutdown was requested
    #[error("Operation cancelled")]
    Cancelled,

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl From<ResourceError> for ControllerError {
    fn from(e: ResourceError) -> Self {
        ControllerError::InvalidInput(e.to_string())
    }
}

/// A status write that did not commit.
#[derive(Debug)]
pub struct WriteFailure {
    pub key: ResourceKey,
    pub error: ControllerError,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.error)
    }
}

struct WriteFailures<'a>(&'a [WriteFailure]);

impl fmt::Display for WriteFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_write_message_lists_failures() {
        let err = ControllerError::StatusWrite(vec![
            WriteFailure {
                key: ResourceKey::pod_monitoring("ns", "a"),
                error: ControllerError::InvalidInput("gone".to_string()),
            },
            WriteFailure {
                key: ResourceKey::cluster_pod_monitoring("b"),
                error: ControllerError::Cancelled,
            },
        ]);
        assert_eq!(
            err.to_string(),
            "Status write failed for 2 resource(s): PodMonitoring ns/a: Invalid input: gone; \
             ClusterPodMonitoring b: Operation cancelled"
        );
    }
}
