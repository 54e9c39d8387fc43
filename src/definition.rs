use anyhow::Result;
use serde::Deserialize;
use std::{collections::HashMap, path::Path};
use uuid::Uuid;

use crate::node::{ContainerImage, Node};
use crate::pod::{Container, Pod, PodPhase};

/// A cluster snapshot as read from a YAML file: the nodes and the pods
/// (including prober pods) the scheduler works with.
#[derive(Debug, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub pods: Vec<PodDefinition>,
}

#[derive(Debug, Deserialize)]
pub struct NodeDefinition {
    name: Option<String>,
    #[serde(default)]
    unschedulable: bool,
    /// Cached images. Each entry lists every name the image is known under.
    #[serde(default)]
    images: Vec<ImageDefinition>,
    #[serde(default)]
    labels: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ImageDefinition {
    Name(String),
    Names { names: Vec<String> },
}

#[derive(Debug, Deserialize)]
pub struct PodDefinition {
    metadata: Metadata,
    #[serde(default)]
    spec: Spec,
    #[serde(default)]
    status: Status,
}

#[derive(Debug, Deserialize)]
pub struct Metadata {
    name: Option<String>,
    #[serde(default = "default_namespace")]
    namespace: String,
    uid: Option<Uuid>,
    #[serde(default)]
    labels: HashMap<String, String>,
    #[serde(default)]
    annotations: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Spec {
    #[serde(rename = "schedulerName", default)]
    scheduler_name: String,
    #[serde(rename = "nodeName")]
    node_name: Option<String>,
    #[serde(default)]
    containers: Vec<ContainerSpec>,
}

#[derive(Debug, Deserialize)]
pub struct ContainerSpec {
    name: String,
    image: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    phase: PodPhase,
    #[serde(rename = "podIP")]
    pod_ip: Option<String>,
}

fn default_namespace() -> String {
    "default".to_owned()
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DefinitionError {
    #[error("field {0} is required")]
    MissingField(String),
}

impl Definition {
    pub async fn from_file(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_contents = tokio::fs::read_to_string(file_path.as_ref()).await?;
        let definition: Definition = serde_yaml::from_str(&file_contents)?;

        for (i, node) in definition.nodes.iter().enumerate() {
            if node.name.as_deref().map_or(true, str::is_empty) {
                return Err(DefinitionError::MissingField(format!("nodes[{i}].name")).into());
            }
        }

        for (i, pod) in definition.pods.iter().enumerate() {
            if pod.metadata.name.as_deref().map_or(true, str::is_empty) {
                return Err(
                    DefinitionError::MissingField(format!("pods[{i}].metadata.name")).into(),
                );
            }
        }

        Ok(definition)
    }

    /// Splits the definition into the node and pod snapshots.
    pub fn into_snapshot(self) -> (Vec<Node>, Vec<Pod>) {
        (
            self.nodes.into_iter().map(Node::from).collect(),
            self.pods.into_iter().map(Pod::from).collect(),
        )
    }
}

impl From<NodeDefinition> for Node {
    fn from(input: NodeDefinition) -> Self {
        Self {
            name: input.name.unwrap_or_default(),
            unschedulable: input.unschedulable,
            images: input
                .images
                .into_iter()
                .map(|image| match image {
                    ImageDefinition::Name(name) => ContainerImage { names: vec![name] },
                    ImageDefinition::Names { names } => ContainerImage { names },
                })
                .collect(),
            labels: input.labels,
        }
    }
}

impl From<PodDefinition> for Pod {
    fn from(input: PodDefinition) -> Self {
        Self {
            namespace: input.metadata.namespace,
            name: input.metadata.name.unwrap_or_default(),
            uid: input.metadata.uid.unwrap_or_else(Uuid::new_v4),
            scheduler_name: input.spec.scheduler_name,
            labels: input.metadata.labels,
            annotations: input.metadata.annotations,
            containers: input
                .spec
                .containers
                .into_iter()
                .map(|container| Container {
                    name: container.name,
                    image: container.image,
                })
                .collect(),
            node_name: input.spec.node_name.filter(|node| !node.is_empty()),
            phase: input.status.phase,
            pod_ip: input.status.pod_ip,
        }
    }
}
