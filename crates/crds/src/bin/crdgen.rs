//! Prints the monitoring CRD manifests as a multi-document YAML stream.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/monitoring.yaml`

use crds::{ClusterPodMonitoring, PodMonitoring};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crds = [PodMonitoring::crd(), ClusterPodMonitoring::crd()];
    for crd in &crds {
        println!("---");
        print!("{}", serde_yaml::to_string(crd)?);
    }
    Ok(())
}
