use std::collections::HashSet;

use tracing::info;

use crate::{
    node::Node,
    pod::Pod,
    prober_locator::ProberLocator,
    scheduler::ScheduleError,
};

/// Returns the nodes `pod` may be placed on, in snapshot order.
///
/// Unschedulable nodes are always dropped. When `locator` is set, nodes
/// without a running prober are dropped as well. Duplicate node names keep
/// their first occurrence.
#[tracing::instrument(name = "filter::eligible_nodes", skip_all, fields(
    pod = %pod.key(),
    nodes = nodes.len()
))]
pub fn eligible_nodes(
    pod: &Pod,
    nodes: Vec<Node>,
    locator: Option<&ProberLocator>,
) -> Result<Vec<Node>, ScheduleError> {
    let mut seen = HashSet::new();
    let mut rejection_reasons = Vec::new();
    let mut eligible = Vec::with_capacity(nodes.len());

    for node in nodes {
        if !seen.insert(node.name.clone()) {
            continue;
        }

        if node.unschedulable {
            rejection_reasons.push(format!("{}: node is unschedulable", node.name));
            continue;
        }

        if let Some(locator) = locator {
            if locator.locate(&node.name).is_none() {
                info!(node = %node.name, "unschedulable: no available prober");
                rejection_reasons.push(format!("{}: no available prober", node.name));
                continue;
            }
        }

        eligible.push(node);
    }

    if eligible.is_empty() {
        return Err(ScheduleError::NoEligibleNode {
            pod: pod.key().to_string(),
            rejection_reasons,
        });
    }

    Ok(eligible)
}
