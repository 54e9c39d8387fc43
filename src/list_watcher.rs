use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info};

use crate::{
    pod::{LabelSelector, Pod, PodEvent},
    scheduler::ClusterState,
    work_queue::WorkQueue,
};

/// Feeds pods waiting for this scheduler into the work queue.
///
/// Pods come from the provider's event stream and from a periodic list of
/// every pending pod, so pods whose decision failed are picked up again.
pub struct ListWatcher {
    resync_interval: Duration,
    scheduler_name: String,
    queue: Arc<WorkQueue>,
    cluster: Arc<dyn ClusterState>,
}

impl ListWatcher {
    pub fn new(
        resync_interval: Duration,
        scheduler_name: String,
        queue: Arc<WorkQueue>,
        cluster: Arc<dyn ClusterState>,
    ) -> Self {
        Self {
            resync_interval,
            scheduler_name,
            queue,
            cluster,
        }
    }

    #[tracing::instrument(name = "ListWatcher::list_and_watch", skip_all, fields(
        scheduler_name = %self.scheduler_name
    ))]
    pub async fn list_and_watch(self, mut events: UnboundedReceiver<PodEvent>) {
        info!("listing and watching pending pods");

        let mut resync_interval = tokio::time::interval(self.resync_interval);

        loop {
            select! {
                _ = resync_interval.tick() => {
                    let pods = self.cluster.list_pods(&LabelSelector::default());

                    let mut pending = 0;
                    for pod in pods.into_iter().filter(|pod| self.wants(pod)) {
                        pending += 1;
                        self.enqueue(pod).await;
                    }

                    debug!(pending, "resynced pending pods");
                },
                message = events.recv() => {
                    match message {
                        None => {
                            info!("pod event stream closed");
                            return;
                        }
                        Some(PodEvent::Added(pod)) | Some(PodEvent::Updated(pod)) => {
                            if self.wants(&pod) {
                                self.enqueue(pod).await;
                            }
                        }
                        Some(PodEvent::Deleted(uid)) => {
                            self.queue.forget(uid);
                        }
                    }
                }
            }
        }
    }

    fn wants(&self, pod: &Pod) -> bool {
        pod.scheduler_name == self.scheduler_name && !pod.is_bound()
    }

    async fn enqueue(&self, pod: Pod) {
        let key = pod.key().to_string();

        match self.queue.append(pod).await {
            Ok(true) => info!(pod = %key, "pod needs placement"),
            Ok(false) => {}
            Err(error) => error!(pod = %key, ?error, "unable to send pod to work queue"),
        }
    }
}
