use std::sync::Arc;

use tracing::debug;

use crate::{
    node::NodeName,
    pod::{LabelSelector, Pod, PodPhase},
    scheduler::ClusterState,
};

/// A running prober agent colocated with a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prober {
    pub name: String,
    pub namespace: String,
    pub node_name: NodeName,
    pub address: String,
}

/// Finds the prober serving a node among the pods matching a label selector.
pub struct ProberLocator {
    cluster: Arc<dyn ClusterState>,
    selector: LabelSelector,
    namespace: String,
}

impl ProberLocator {
    pub fn new(cluster: Arc<dyn ClusterState>, selector: LabelSelector, namespace: String) -> Self {
        Self {
            cluster,
            selector,
            namespace,
        }
    }

    /// Returns the first running prober in the configured namespace that is
    /// placed on `node_name` and has an address. `None` when there is none.
    #[tracing::instrument(name = "ProberLocator::locate", skip_all, fields(
        node = %node_name
    ))]
    pub fn locate(&self, node_name: &str) -> Option<Prober> {
        let candidates = self.cluster.list_pods(&self.selector);

        let prober = candidates
            .iter()
            .find(|pod| self.serves(pod, node_name))
            .and_then(|pod| {
                Some(Prober {
                    name: pod.name.clone(),
                    namespace: pod.namespace.clone(),
                    node_name: node_name.to_owned(),
                    address: pod.pod_ip.clone()?,
                })
            });

        if prober.is_none() {
            debug!(candidates = candidates.len(), "no prober found for node");
        }

        prober
    }

    fn serves(&self, pod: &Pod, node_name: &str) -> bool {
        pod.namespace == self.namespace
            && pod.node_name.as_deref() == Some(node_name)
            && pod.phase == PodPhase::Running
            && pod.pod_ip.as_deref().is_some_and(|ip| !ip.is_empty())
            && self.selector.matches(&pod.labels)
    }
}
