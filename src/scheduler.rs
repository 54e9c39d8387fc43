use async_trait::async_trait;

use crate::{
    binder::BindError,
    node::{Node, NodeName},
    pod::{LabelSelector, Pod},
};

/// Read-only view of the cluster maintained by an external state provider.
#[async_trait]
pub trait ClusterState: Send + Sync {
    fn list_nodes(&self) -> Vec<Node>;

    fn list_pods(&self, selector: &LabelSelector) -> Vec<Pod>;

    /// Resolves once the provider has a complete snapshot.
    async fn wait_until_synced(&self);
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("pod {pod} is unschedulable: no eligible node")]
    NoEligibleNode {
        pod: String,
        rejection_reasons: Vec<String>,
    },
    #[error("pod {pod} is unschedulable: placement quota exhausted")]
    QuotaExhausted { pod: String },
    #[error("unable to bind pod {pod} to node {node}: {source}")]
    BindFailed {
        pod: String,
        node: NodeName,
        #[source]
        source: BindError,
    },
}

/// Progress of a single scheduling decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodState {
    Unbound,
    Filtering,
    Scoring,
    Selected,
    Binding,
    Bound,
    NoEligibleNode,
    QuotaExhausted,
    BindFailed,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid pod state transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: PodState,
    pub to: PodState,
}

impl PodState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PodState::Bound
                | PodState::NoEligibleNode
                | PodState::QuotaExhausted
                | PodState::BindFailed
        )
    }

    fn can_transition_to(self, next: PodState) -> bool {
        use PodState::*;

        matches!(
            (self, next),
            (Unbound, Filtering)
                | (Filtering, Scoring)
                | (Filtering, NoEligibleNode)
                | (Scoring, Selected)
                | (Scoring, NoEligibleNode)
                | (Selected, Binding)
                | (Selected, QuotaExhausted)
                | (Binding, Bound)
                | (Binding, BindFailed)
        )
    }

    /// Moves to `next`. Terminal states are never left.
    pub fn advance(&mut self, next: PodState) -> Result<(), InvalidTransition> {
        if !self.can_transition_to(next) {
            return Err(InvalidTransition {
                from: *self,
                to: next,
            });
        }

        *self = next;

        Ok(())
    }
}
