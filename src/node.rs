use std::collections::HashMap;

pub type NodeName = String;

/// An image cached on a node. The same image is usually known under several
/// names (tag and digest references).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerImage {
    pub names: Vec<String>,
}

/// Represents a machine pods can be placed on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    /// The name of the node.
    pub name: NodeName,
    /// Set by an administrator to keep new pods away from the node.
    pub unschedulable: bool,
    /// Images already pulled by the node.
    pub images: Vec<ContainerImage>,
    pub labels: HashMap<String, String>,
}

impl Node {
    pub fn new(name: impl Into<NodeName>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_images<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.images.extend(images.into_iter().map(|name| ContainerImage {
            names: vec![name.into()],
        }));
        self
    }

    pub fn cordoned(mut self) -> Self {
        self.unschedulable = true;
        self
    }

    /// Returns true when any cached image is known under `image`.
    pub fn has_image(&self, image: &str) -> bool {
        self.images
            .iter()
            .any(|cached| cached.names.iter().any(|name| name == image))
    }
}
