use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::node::NodeName;

pub type PodUid = Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum PodPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub name: String,
    pub image: String,
}

/// A unit of workload that has to be placed on exactly one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pod {
    pub namespace: String,
    pub name: String,
    pub uid: PodUid,
    /// Name of the scheduler responsible for placing the pod.
    pub scheduler_name: String,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub containers: Vec<Container>,
    /// The node the pod is bound to. `None` until a bind succeeds.
    pub node_name: Option<NodeName>,
    pub phase: PodPhase,
    pub pod_ip: Option<String>,
}

impl Pod {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            uid: Uuid::new_v4(),
            scheduler_name: String::new(),
            labels: HashMap::new(),
            annotations: HashMap::new(),
            containers: Vec::new(),
            node_name: None,
            phase: PodPhase::Pending,
            pod_ip: None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.node_name.as_deref().is_some_and(|node| !node.is_empty())
    }

    /// Images required by the pod's containers, in declaration order.
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.containers.iter().map(|container| container.image.as_str())
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn key(&self) -> PodKey<'_> {
        PodKey(self)
    }
}

/// Displays a pod as `namespace/name`.
pub struct PodKey<'a>(&'a Pod);

impl fmt::Display for PodKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0.namespace, self.0.name)
    }
}

/// Equality-based label selector: every pair must be present on the object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct LabelSelector(BTreeMap<String, String>);

impl LabelSelector {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.0
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}

/// The assignment of a pod to a node handed to the binding API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub namespace: String,
    pub pod_name: String,
    pub pod_uid: PodUid,
    pub node_name: NodeName,
    pub created_at: DateTime<Utc>,
}

impl Binding {
    pub fn new(pod: &Pod, node_name: impl Into<NodeName>) -> Self {
        Self {
            namespace: pod.namespace.clone(),
            pod_name: pod.name.clone(),
            pod_uid: pod.uid,
            node_name: node_name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Notifications delivered by the cluster state provider.
#[derive(Debug, Clone)]
pub enum PodEvent {
    Added(Pod),
    Updated(Pod),
    Deleted(PodUid),
}
