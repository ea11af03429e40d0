//! Status aggregation.
//!
//! Turns the raw target lists of one poll cycle into per-endpoint status
//! summaries for every monitoring resource that has matched targets. The
//! output depends only on the set of targets, never on the order in which
//! collectors answered.

use crate::error::ControllerError;
use crate::fetcher::RawFetchResult;
use crate::scrape_pool::{self, ScrapePoolId};
use chrono::{DateTime, Utc};
use collector_client::ActiveTarget;
use crds::{MonitoringResource, ResourceKey, SampleGroup, SampleTarget, ScrapeEndpointStatus};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Maximum number of sample targets kept per group
pub const MAX_SAMPLE_TARGETS: usize = 5;

/// New endpoint statuses for one resource
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub key: ResourceKey,
    pub endpoint_statuses: Vec<ScrapeEndpointStatus>,
}

/// Aggregate one cycle's fetch results into status updates.
///
/// Resources without a single matched target produce no update. Every update
/// carries `observed_at` and the fraction of collectors that answered.
pub fn aggregate(
    observed_at: DateTime<Utc>,
    resources: &[MonitoringResource],
    results: &[RawFetchResult],
) -> Result<Vec<StatusUpdate>, ControllerError> {
    let keys = resources
        .iter()
        .map(|resource| resource.key())
        .collect::<Result<Vec<_>, _>>()?;

    // Every declared endpoint, in declaration order without duplicates
    let endpoint_ids: Vec<Vec<ScrapePoolId>> = resources
        .iter()
        .zip(&keys)
        .map(|(resource, key)| {
            let mut ids: Vec<ScrapePoolId> = Vec::with_capacity(resource.endpoints().len());
            for endpoint in resource.endpoints() {
                let id = ScrapePoolId::for_endpoint(key, endpoint.port.to_string());
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            ids
        })
        .collect();

    let mut buckets: HashMap<&ScrapePoolId, Vec<&ActiveTarget>> = endpoint_ids
        .iter()
        .flatten()
        .map(|id| (id, Vec::new()))
        .collect();

    for target in results.iter().flatten().flat_map(|result| &result.active) {
        let id = match scrape_pool::decode(&target.scrape_pool) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Dropping target with malformed scrape pool");
                continue;
            }
        };
        match buckets.get_mut(&id) {
            Some(bucket) => bucket.push(target),
            None => debug!(scrape_pool = %target.scrape_pool, "Dropping target of unknown endpoint"),
        }
    }

    let collectors_fraction = collectors_fraction(results);

    let mut updates = Vec::new();
    for (key, ids) in keys.into_iter().zip(&endpoint_ids) {
        let matched = ids.iter().any(|id| buckets.get(id).is_some_and(|b| !b.is_empty()));
        if !matched {
            continue;
        }

        let endpoint_statuses = ids
            .iter()
            .map(|id| {
                let targets = buckets.get(id).map(Vec::as_slice).unwrap_or_default();
                endpoint_status(id, targets, observed_at, &collectors_fraction)
            })
            .collect();

        updates.push(StatusUpdate { key, endpoint_statuses });
    }

    Ok(updates)
}

fn endpoint_status(
    id: &ScrapePoolId,
    targets: &[&ActiveTarget],
    observed_at: DateTime<Utc>,
    collectors_fraction: &str,
) -> ScrapeEndpointStatus {
    // BTreeMap orders groups by (health, last error)
    let mut groups: BTreeMap<(&str, &str), Vec<&ActiveTarget>> = BTreeMap::new();
    for &target in targets {
        groups
            .entry((target.health.as_str(), target.last_error.as_str()))
            .or_default()
            .push(target);
    }

    let mut unhealthy_targets = 0;
    let sample_groups = groups
        .into_iter()
        .map(|((health, _), members)| {
            if health == "down" {
                unhealthy_targets += members.len() as i64;
            }
            let count = i32::try_from(members.len()).unwrap_or(i32::MAX);

            let mut keyed: Vec<(String, &ActiveTarget)> = members
                .into_iter()
                .map(|target| (label_string(&target.labels), target))
                .collect();
            keyed.sort_by(|(a_labels, a), (b_labels, b)| {
                a_labels
                    .cmp(b_labels)
                    .then_with(|| a.last_scrape_duration.total_cmp(&b.last_scrape_duration))
            });

            SampleGroup {
                sample_targets: keyed
                    .into_iter()
                    .take(MAX_SAMPLE_TARGETS)
                    .map(|(_, target)| sample_target(target))
                    .collect(),
                count,
            }
        })
        .collect();

    ScrapeEndpointStatus {
        name: id.to_string(),
        active_targets: targets.len() as i64,
        unhealthy_targets,
        last_update_time: observed_at,
        sample_groups,
        collectors_fraction: collectors_fraction.to_string(),
    }
}

fn sample_target(target: &ActiveTarget) -> SampleTarget {
    SampleTarget {
        labels: target.labels.clone(),
        last_error: target.last_error().map(str::to_string),
        last_scrape_duration_seconds: format_decimal(target.last_scrape_duration),
        health: target.health.to_string(),
    }
}

/// Fraction of collectors that returned a result, over the whole batch
fn collectors_fraction(results: &[RawFetchResult]) -> String {
    if results.is_empty() {
        return format_decimal(0.0);
    }
    let present = results.iter().filter(|r| r.is_some()).count();
    format_decimal(present as f64 / results.len() as f64)
}

/// Shortest decimal that round-trips, without exponent or trailing zeros
/// (`1`, `0.4`, `8.3`).
pub fn format_decimal(value: f64) -> String {
    format!("{}", value)
}

/// Canonical form of a label set: `{k1="v1", k2="v2"}` with keys ascending
pub fn label_string(labels: &BTreeMap<String, String>) -> String {
    let mut out = String::from("{");
    for (i, (name, value)) in labels.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(name);
        out.push_str("=\"");
        push_quoted(&mut out, value);
        out.push('"');
    }
    out.push('}');
    out
}

/// Escapes control characters, quotes and backslashes of a label value
fn push_quoted(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0c' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0b' => out.push_str("\\v"),
            c if (c as u32) < 0x80 && c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
}
