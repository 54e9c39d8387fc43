use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    config::{AnnotationKeys, NetworkLatencyConfig, StrategyConfig},
    constants::{IMAGE_FALLBACK_SCORE_CEILING, IMAGE_PRESENT_SCORE, MAX_NODE_SCORE},
    node::Node,
    pod::Pod,
    prober_client::ProberClient,
    prober_locator::ProberLocator,
    random::RandomSource,
    scheduler::ClusterState,
};

/// Computes a raw score for placing a pod on a node. Higher is better and
/// zero means "no opinion".
#[async_trait]
pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn score(&self, pod: &Pod, node: &Node) -> i64;
}

/// Prefers nodes that already hold the pod's images.
pub struct ImageLocality {
    random: Arc<RandomSource>,
}

impl ImageLocality {
    pub fn new(random: Arc<RandomSource>) -> Self {
        Self { random }
    }
}

#[async_trait]
impl Scorer for ImageLocality {
    fn name(&self) -> &'static str {
        "ImageLocality"
    }

    async fn score(&self, pod: &Pod, node: &Node) -> i64 {
        let score: i64 = pod
            .images()
            .filter(|image| node.has_image(image))
            .map(|_| IMAGE_PRESENT_SCORE)
            .sum();

        if score > 0 {
            return score;
        }

        // Keeps nodes without any cached image rankable.
        self.random.below(IMAGE_FALLBACK_SCORE_CEILING as u64) as i64
    }
}

/// Prefers nodes whose prober reaches the pod's probe target fastest.
pub struct NetworkLatency {
    locator: ProberLocator,
    client: ProberClient,
    default_module: String,
    annotations: AnnotationKeys,
}

impl NetworkLatency {
    pub fn new(
        locator: ProberLocator,
        client: ProberClient,
        default_module: String,
        annotations: AnnotationKeys,
    ) -> Self {
        Self {
            locator,
            client,
            default_module,
            annotations,
        }
    }

    pub fn from_config(config: &NetworkLatencyConfig, cluster: Arc<dyn ClusterState>) -> Self {
        let prober = &config.prober;

        Self::new(
            ProberLocator::new(cluster, prober.selector.clone(), prober.namespace.clone()),
            ProberClient::new(prober.port, prober.timeout()),
            prober.module.clone(),
            config.annotations.clone(),
        )
    }

    pub fn locator(&self) -> &ProberLocator {
        &self.locator
    }

    /// Probe target and module requested by the pod, if it asks for a probe.
    fn probe_config<'a>(&'a self, pod: &'a Pod) -> Option<(&'a str, &'a str)> {
        let target = pod.annotation(&self.annotations.target)?;
        let module = pod
            .annotation(&self.annotations.module)
            .unwrap_or(self.default_module.as_str());

        Some((target, module))
    }
}

#[async_trait]
impl Scorer for NetworkLatency {
    fn name(&self) -> &'static str {
        "NetworkLatency"
    }

    #[tracing::instrument(name = "NetworkLatency::score", skip_all, fields(
        pod = %pod.key(),
        node = %node.name
    ))]
    async fn score(&self, pod: &Pod, node: &Node) -> i64 {
        let Some((target, module)) = self.probe_config(pod) else {
            debug!("pod has no probe target annotation");
            return 0;
        };

        let Some(prober) = self.locator.locate(&node.name) else {
            debug!("no prober available, scoring node as neutral");
            return 0;
        };

        match self.client.probe(&prober.address, module, target).await {
            Err(error) => {
                warn!(%error, prober = %prober.name, "probe failed");
                0
            }
            Ok(duration) => {
                let score = latency_score(duration);
                info!(%target, ?duration, score, "probe completed");
                score
            }
        }
    }
}

/// Maps a probe duration to a score: anything under one second scores
/// `MAX_NODE_SCORE`, one second or more scores zero.
pub fn latency_score(duration: Duration) -> i64 {
    let score = (1.0 - duration.as_secs_f64()).ceil() as i64 * MAX_NODE_SCORE;

    score.max(0)
}

/// The placement strategy a scheduler runs, chosen at construction.
pub enum Strategy {
    ImageLocality(ImageLocality),
    /// Picks uniformly among eligible nodes without scoring them.
    UniformRandom,
    NetworkLatency(NetworkLatency),
}

impl Strategy {
    pub fn from_config(
        config: &StrategyConfig,
        cluster: Arc<dyn ClusterState>,
        random: Arc<RandomSource>,
    ) -> Self {
        match config {
            StrategyConfig::ImageLocality => Strategy::ImageLocality(ImageLocality::new(random)),
            StrategyConfig::UniformRandom => Strategy::UniformRandom,
            StrategyConfig::NetworkLatency(network) => {
                Strategy::NetworkLatency(NetworkLatency::from_config(network, cluster))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::UniformRandom => "UniformRandom",
            Strategy::ImageLocality(scorer) => scorer.name(),
            Strategy::NetworkLatency(scorer) => scorer.name(),
        }
    }

    /// The scorer to run, `None` for strategies that do not score.
    pub fn scorer(&self) -> Option<&dyn Scorer> {
        match self {
            Strategy::UniformRandom => None,
            Strategy::ImageLocality(scorer) => Some(scorer),
            Strategy::NetworkLatency(scorer) => Some(scorer),
        }
    }

    /// Locator used to drop nodes without a prober, for probe-based strategies.
    pub fn prober_locator(&self) -> Option<&ProberLocator> {
        match self {
            Strategy::NetworkLatency(scorer) => Some(scorer.locator()),
            _ => None,
        }
    }
}
