use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::{
    pod::{Binding, Pod},
    scheduler::ScheduleError,
};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum BindError {
    #[error("pod {0} not found")]
    PodNotFound(String),
    #[error("pod {pod} is already bound to {node}")]
    AlreadyBound { pod: String, node: String },
    #[error("node {0} not found")]
    NodeNotFound(String),
    #[error("binding rejected: {0}")]
    Rejected(String),
}

/// External API durably recording pod to node assignments.
#[async_trait]
pub trait BindingApi: Send + Sync {
    async fn bind(&self, binding: &Binding) -> Result<(), BindError>;
}

/// Commits scheduling decisions. Failed binds are reported, never retried.
#[derive(Clone)]
pub struct Binder {
    api: Arc<dyn BindingApi>,
}

impl Binder {
    pub fn new(api: Arc<dyn BindingApi>) -> Self {
        Self { api }
    }

    #[tracing::instrument(name = "Binder::bind", skip_all, fields(
        pod = %pod.key(),
        node = %node_name
    ))]
    pub async fn bind(&self, pod: &Pod, node_name: &str) -> Result<Binding, ScheduleError> {
        let binding = Binding::new(pod, node_name);

        match self.api.bind(&binding).await {
            Ok(()) => {
                info!("pod bound");
                Ok(binding)
            }
            Err(source) => {
                error!(error = %source, "bind pod error");
                Err(ScheduleError::BindFailed {
                    pod: pod.key().to_string(),
                    node: node_name.to_owned(),
                    source,
                })
            }
        }
    }
}
