use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, info_span, warn};
use tracing_futures::Instrument;

use crate::{
    binder::{BindError, Binder, BindingApi},
    config::{Config, StrategyConfig},
    filter,
    list_watcher::ListWatcher,
    node::{Node, NodeName},
    normalize::{self, ScoreEntry},
    pod::{Binding, Pod, PodEvent},
    quota::AdmissionQuota,
    random::RandomSource,
    scheduler::{ClusterState, PodState, ScheduleError},
    strategy::Strategy,
    work_queue::WorkQueue,
};

/// Places pending pods: filter, score, normalize, select, admit, bind.
pub struct SimpleScheduler {
    scheduler_name: String,
    resync_interval: Duration,
    /// Snapshot of nodes and probers, owned by an external provider.
    cluster: Arc<dyn ClusterState>,
    strategy: Strategy,
    /// Remaining placement permits, shared by every in-flight decision.
    quota: Arc<AdmissionQuota>,
    binder: Binder,
    random: Arc<RandomSource>,
    /// Pods waiting for a decision.
    queue: Arc<WorkQueue>,
}

impl SimpleScheduler {
    #[tracing::instrument(name = "SimpleScheduler::new", skip_all, fields(
        scheduler_name = %scheduler_name,
        strategy = strategy.name()
    ))]
    pub fn new(
        scheduler_name: String,
        resync_interval: Duration,
        cluster: Arc<dyn ClusterState>,
        binding_api: Arc<dyn BindingApi>,
        strategy: Strategy,
        quota: Arc<AdmissionQuota>,
        random: Arc<RandomSource>,
    ) -> Self {
        Self {
            scheduler_name,
            resync_interval,
            cluster,
            strategy,
            quota,
            binder: Binder::new(binding_api),
            random,
            queue: Arc::new(WorkQueue::new()),
        }
    }

    /// Builds a scheduler running the strategy selected by `config`.
    ///
    /// The quota only gates the network latency strategy.
    pub fn from_config(
        config: &Config,
        cluster: Arc<dyn ClusterState>,
        binding_api: Arc<dyn BindingApi>,
    ) -> Self {
        let random = Arc::new(RandomSource::from_seed(config.seed));
        let strategy = Strategy::from_config(&config.strategy, Arc::clone(&cluster), Arc::clone(&random));
        let quota = match &config.strategy {
            StrategyConfig::NetworkLatency(network) => AdmissionQuota::new(network.quota),
            _ => AdmissionQuota::unlimited(),
        };

        Self::new(
            config.scheduler_name.clone(),
            config.resync_interval(),
            cluster,
            binding_api,
            strategy,
            Arc::new(quota),
            random,
        )
    }

    pub fn quota(&self) -> &AdmissionQuota {
        &self.quota
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Waits for the cluster snapshot, then runs one decision per pod that
    /// needs placement until the event stream and the queue are closed.
    #[tracing::instrument(name = "SimpleScheduler::watch_cluster_state_changes", skip_all)]
    pub async fn watch_cluster_state_changes(self: Arc<Self>, events: UnboundedReceiver<PodEvent>) {
        self.cluster.wait_until_synced().await;

        info!("cluster state has synced");

        let list_watcher = ListWatcher::new(
            self.resync_interval,
            self.scheduler_name.clone(),
            Arc::clone(&self.queue),
            Arc::clone(&self.cluster),
        );

        tokio::spawn(list_watcher.list_and_watch(events));

        while let Some(pod) = self.queue.next().await {
            let scheduler = Arc::clone(&self);
            let span = info_span!("decision", pod = %pod.key());

            tokio::spawn(
                async move { scheduler.handle(pod).await }.instrument(span),
            );
        }

        error!("work queue closed unexpectedly");
    }

    /// Schedules `pods` concurrently, once per distinct pod.
    #[tracing::instrument(name = "SimpleScheduler::schedule_all", skip_all, fields(
        pods = pods.len()
    ))]
    pub async fn schedule_all(&self, pods: Vec<Pod>) -> Vec<(Pod, Result<Binding, ScheduleError>)> {
        let mut seen = HashSet::new();
        let pods: Vec<Pod> = pods
            .into_iter()
            .filter(|pod| seen.insert(pod.uid))
            .collect();

        let results = join_all(pods.iter().map(|pod| self.schedule(pod))).await;

        pods.into_iter().zip(results).collect()
    }

    async fn handle(&self, pod: Pod) {
        if let Err(error) = self.schedule(&pod).await {
            warn!(%error, "scheduling decision failed");
            // The next event for this pod re-evaluates it.
            self.queue.release(pod.uid);
        }
    }

    /// Runs one scheduling decision for `pod`.
    #[tracing::instrument(name = "SimpleScheduler::schedule", skip_all, fields(
        pod = %pod.key(),
        strategy = self.strategy.name()
    ))]
    pub async fn schedule(&self, pod: &Pod) -> Result<Binding, ScheduleError> {
        if let Some(node) = pod.node_name.as_ref().filter(|_| pod.is_bound()) {
            return Err(ScheduleError::BindFailed {
                pod: pod.key().to_string(),
                node: node.clone(),
                source: BindError::AlreadyBound {
                    pod: pod.key().to_string(),
                    node: node.clone(),
                },
            });
        }

        let mut state = PodState::Unbound;

        transition(&mut state, PodState::Filtering);
        let nodes = self.cluster.list_nodes();
        let eligible = match filter::eligible_nodes(pod, nodes, self.strategy.prober_locator()) {
            Ok(eligible) => eligible,
            Err(error) => {
                transition(&mut state, PodState::NoEligibleNode);
                info!(%error, "no available node");
                return Err(error);
            }
        };

        transition(&mut state, PodState::Scoring);
        let Some(node_name) = self.select_node(pod, &eligible).await else {
            transition(&mut state, PodState::NoEligibleNode);
            return Err(ScheduleError::NoEligibleNode {
                pod: pod.key().to_string(),
                rejection_reasons: Vec::new(),
            });
        };

        transition(&mut state, PodState::Selected);
        if !self.quota.try_admit() {
            transition(&mut state, PodState::QuotaExhausted);
            info!(node = %node_name, "placement quota exhausted");
            return Err(ScheduleError::QuotaExhausted {
                pod: pod.key().to_string(),
            });
        }

        transition(&mut state, PodState::Binding);
        match self.binder.bind(pod, &node_name).await {
            Ok(binding) => {
                self.quota.release();
                transition(&mut state, PodState::Bound);
                info!(node = %node_name, remaining_quota = ?self.quota.remaining(), "pod scheduled");
                Ok(binding)
            }
            Err(error) => {
                transition(&mut state, PodState::BindFailed);
                Err(error)
            }
        }
    }

    /// Picks the node for `pod` among `eligible` using the configured strategy.
    async fn select_node(&self, pod: &Pod, eligible: &[Node]) -> Option<NodeName> {
        let names: Vec<NodeName> = eligible.iter().map(|node| node.name.clone()).collect();

        if names.len() == 1 {
            return names.into_iter().next();
        }

        let Some(scorer) = self.strategy.scorer() else {
            return normalize::select_uniform(&names, &self.random).map(str::to_owned);
        };

        let mut scores: Vec<ScoreEntry> = join_all(eligible.iter().map(|node| async move {
            ScoreEntry::new(node.name.clone(), scorer.score(pod, node).await)
        }))
        .await;

        debug!(?scores, "raw scores");

        normalize::normalize(&mut scores);

        info!(?scores, "normalized scores");

        normalize::select(&scores, &names).map(str::to_owned)
    }
}

fn transition(state: &mut PodState, next: PodState) {
    match state.advance(next) {
        Ok(()) => debug!(state = ?next, "pod state changed"),
        Err(error) => error!(%error, "unexpected pod state change, this is a bug."),
    }
}
