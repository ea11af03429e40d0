//! Controller configuration.
//!
//! All settings come from environment variables and are validated once at
//! startup, before any watcher or poll cycle runs.

use crate::error::ControllerError;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_NAMESPACE: &str = "monitoring-system";
pub const DEFAULT_COLLECTOR_NAME: &str = "collector";
pub const DEFAULT_COLLECTOR_PORT_NAME: &str = "prom-metrics";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;

/// Runtime configuration of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace the collector DaemonSet runs in
    pub namespace: String,
    /// Name of the collector DaemonSet
    pub collector_name: String,
    /// Name of the container port serving the target API
    pub collector_port_name: String,
    /// Maximum number of collectors polled at once
    pub concurrency: usize,
    /// Minimum time between the end of one poll cycle and the start of the next
    pub poll_interval: Duration,
    /// Timeout of a single collector request
    pub fetch_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            collector_name: DEFAULT_COLLECTOR_NAME.to_string(),
            collector_port_name: DEFAULT_COLLECTOR_PORT_NAME.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Load configuration from a set of variables
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ControllerError> {
        let string = |key: &str, default: &str| -> Result<String, ControllerError> {
            match vars.get(key) {
                Some(value) if value.trim().is_empty() => Err(ControllerError::InvalidConfig(
                    format!("{} must not be empty", key),
                )),
                Some(value) => Ok(value.trim().to_string()),
                None => Ok(default.to_string()),
            }
        };
        let number = |key: &str, default: u64| -> Result<u64, ControllerError> {
            match vars.get(key) {
                Some(value) => value.trim().parse::<u64>().map_err(|e| {
                    ControllerError::InvalidConfig(format!("{}={:?} is not a valid integer: {}", key, value, e))
                }),
                None => Ok(default),
            }
        };

        let config = Self {
            namespace: string("OPERATOR_NAMESPACE", DEFAULT_NAMESPACE)?,
            collector_name: string("COLLECTOR_NAME", DEFAULT_COLLECTOR_NAME)?,
            collector_port_name: string("COLLECTOR_PORT_NAME", DEFAULT_COLLECTOR_PORT_NAME)?,
            concurrency: number("TARGET_POLL_CONCURRENCY", DEFAULT_CONCURRENCY as u64)? as usize,
            poll_interval: Duration::from_secs(number("TARGET_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?),
            fetch_timeout: Duration::from_secs(number("TARGET_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the scheduler and fetcher cannot run with
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "TARGET_POLL_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "TARGET_POLL_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "TARGET_FETCH_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::from_vars(HashMap::new()).unwrap();
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.poll_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = ControllerConfig::from_vars(vars(&[
            ("OPERATOR_NAMESPACE", "observability"),
            ("TARGET_POLL_CONCURRENCY", "16"),
            ("TARGET_POLL_INTERVAL_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.namespace, "observability");
        assert_eq!(config.concurrency, 16);
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.collector_name, DEFAULT_COLLECTOR_NAME);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let result = ControllerConfig::from_vars(vars(&[("TARGET_POLL_CONCURRENCY", "0")]));
        assert!(matches!(result, Err(ControllerError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let result = ControllerConfig::from_vars(vars(&[("TARGET_POLL_INTERVAL_SECS", "0")]));
        assert!(matches!(result, Err(ControllerError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_garbage_and_empty_values() {
        assert!(ControllerConfig::from_vars(vars(&[("TARGET_FETCH_TIMEOUT_SECS", "soon")])).is_err());
        assert!(ControllerConfig::from_vars(vars(&[("COLLECTOR_NAME", " ")])).is_err());
    }
}
