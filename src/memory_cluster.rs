//! In-memory cluster state provider and binding API.
//!
//! Backs the `network-scheduler run` command with a snapshot read from a
//! definition file, and stands in for a real cluster in tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::{
    binder::{BindError, BindingApi},
    node::{Node, NodeName},
    pod::{Binding, LabelSelector, Pod, PodEvent, PodUid},
    scheduler::ClusterState,
};

#[derive(Debug, Default)]
struct State {
    nodes: Vec<Node>,
    pods: Vec<Pod>,
    bindings: Vec<Binding>,
    rejected_nodes: HashSet<NodeName>,
}

pub struct InMemoryCluster {
    state: RwLock<State>,
    synced: watch::Sender<bool>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<PodEvent>>>,
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCluster {
    pub fn new() -> Self {
        let (synced, _) = watch::channel(false);

        Self {
            state: RwLock::new(State::default()),
            synced,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Builds a cluster that is already synced.
    pub fn with_snapshot(nodes: Vec<Node>, pods: Vec<Pod>) -> Self {
        let cluster = Self::new();
        {
            let mut state = cluster.write();
            state.nodes = nodes;
            state.pods = pods;
        }
        cluster.mark_synced();
        cluster
    }

    pub fn mark_synced(&self) {
        self.synced.send_replace(true);
        info!("cluster state synced");
    }

    /// Returns a stream of pod events. Pods present at subscription time are
    /// delivered first as `Added` events.
    ///
    /// The subscriber is registered under the state lock, so every pod is
    /// either replayed or published to it. A pod added concurrently may be
    /// delivered twice.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PodEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        let state = self.read();
        for pod in state.pods.iter() {
            let _ = tx.send(PodEvent::Added(pod.clone()));
        }
        self.subscribers().push(tx);
        drop(state);

        rx
    }

    pub fn add_node(&self, node: Node) {
        self.write().nodes.push(node);
    }

    pub fn add_pod(&self, pod: Pod) {
        self.write().pods.push(pod.clone());
        self.publish(PodEvent::Added(pod));
    }

    pub fn update_pod(&self, pod: Pod) {
        {
            let mut state = self.write();
            match state.pods.iter_mut().find(|existing| existing.uid == pod.uid) {
                Some(existing) => *existing = pod.clone(),
                None => state.pods.push(pod.clone()),
            }
        }
        self.publish(PodEvent::Updated(pod));
    }

    pub fn delete_pod(&self, uid: PodUid) {
        self.write().pods.retain(|pod| pod.uid != uid);
        self.publish(PodEvent::Deleted(uid));
    }

    /// Makes every bind to `node_name` fail.
    pub fn reject_binds_to(&self, node_name: impl Into<NodeName>) {
        self.write().rejected_nodes.insert(node_name.into());
    }

    pub fn pod(&self, uid: PodUid) -> Option<Pod> {
        self.read().pods.iter().find(|pod| pod.uid == uid).cloned()
    }

    pub fn bindings(&self) -> Vec<Binding> {
        self.read().bindings.clone()
    }

    /// Pods requesting `scheduler_name` that are not bound yet.
    pub fn pending_pods(&self, scheduler_name: &str) -> Vec<Pod> {
        self.read()
            .pods
            .iter()
            .filter(|pod| pod.scheduler_name == scheduler_name && !pod.is_bound())
            .cloned()
            .collect()
    }

    fn publish(&self, event: PodEvent) {
        self.subscribers()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<PodEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ClusterState for InMemoryCluster {
    fn list_nodes(&self) -> Vec<Node> {
        self.read().nodes.clone()
    }

    fn list_pods(&self, selector: &LabelSelector) -> Vec<Pod> {
        self.read()
            .pods
            .iter()
            .filter(|pod| selector.matches(&pod.labels))
            .cloned()
            .collect()
    }

    async fn wait_until_synced(&self) {
        let mut synced = self.synced.subscribe();
        // The sender lives as long as `self`, so this only fails on shutdown.
        let _ = synced.wait_for(|synced| *synced).await;
    }
}

#[async_trait]
impl BindingApi for InMemoryCluster {
    #[tracing::instrument(name = "InMemoryCluster::bind", skip_all, fields(
        pod = %binding.pod_name,
        node = %binding.node_name
    ))]
    async fn bind(&self, binding: &Binding) -> Result<(), BindError> {
        let bound = {
            let mut state = self.write();

            if state.rejected_nodes.contains(&binding.node_name) {
                return Err(BindError::Rejected(format!(
                    "node {} refuses new pods",
                    binding.node_name
                )));
            }

            if !state.nodes.iter().any(|node| node.name == binding.node_name) {
                return Err(BindError::NodeNotFound(binding.node_name.clone()));
            }

            let pod = state
                .pods
                .iter_mut()
                .find(|pod| pod.uid == binding.pod_uid)
                .ok_or_else(|| {
                    BindError::PodNotFound(format!("{}/{}", binding.namespace, binding.pod_name))
                })?;

            if let Some(node) = pod.node_name.as_ref().filter(|node| !node.is_empty()) {
                return Err(BindError::AlreadyBound {
                    pod: format!("{}/{}", pod.namespace, pod.name),
                    node: node.clone(),
                });
            }

            pod.node_name = Some(binding.node_name.clone());
            let bound = pod.clone();

            state.bindings.push(binding.clone());

            bound
        };

        debug!("binding recorded");
        self.publish(PodEvent::Updated(bound));

        Ok(())
    }
}
