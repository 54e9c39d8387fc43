/// Scheduler name pods must request to be handled by this scheduler.
pub const DEFAULT_SCHEDULER_NAME: &str = "network-scheduler";

/// Metric read from the prober response body.
pub const PROBE_DURATION_METRIC: &str = "probe_duration_seconds";

pub const DEFAULT_PROBER_PORT: u16 = 9115;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_PROBE_MODULE: &str = "http_2xx";

/// Largest probe response body read before giving up.
pub const MAX_PROBE_RESPONSE_BYTES: usize = 1024 * 1024;

pub const PROBE_TARGET_ANNOTATION: &str = "network-scheduler/probe-target";
pub const PROBE_MODULE_ANNOTATION: &str = "network-scheduler/probe-module";

/// Bonus granted per required image already cached on a node.
pub const IMAGE_PRESENT_SCORE: i64 = 100;

/// Upper bound (exclusive) of the fallback score when no image matches.
pub const IMAGE_FALLBACK_SCORE_CEILING: i64 = 50;

/// Highest score the normalizer hands out.
pub const MAX_NODE_SCORE: i64 = 100;

pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 15;

pub const WORK_QUEUE_CHANNEL_BUFFER_SIZE: usize = 100;
