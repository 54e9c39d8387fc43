use std::collections::HashSet;
use std::sync::Mutex as SyncMutex;

use tokio::sync::mpsc::{error::SendError, Receiver, Sender};
use tokio::sync::Mutex;

use crate::constants::WORK_QUEUE_CHANNEL_BUFFER_SIZE;
use crate::pod::{Pod, PodUid};

/// Queue of pods waiting for a scheduling decision.
///
/// A pod is claimed when it is appended and stays claimed while it is queued,
/// being scheduled, or after it was bound, so the same pod is never handed
/// out twice for binding.
pub struct WorkQueue {
    tx: Sender<Pod>,
    rx: Mutex<Receiver<Pod>>,
    claimed: SyncMutex<HashSet<PodUid>>,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    #[tracing::instrument(name = "WorkQueue::new", skip_all)]
    pub fn new() -> Self {
        let (tx, rx) = tokio::sync::mpsc::channel(WORK_QUEUE_CHANNEL_BUFFER_SIZE);

        Self {
            tx,
            rx: Mutex::new(rx),
            claimed: SyncMutex::new(HashSet::new()),
        }
    }

    /// Enqueues `pod` unless it is already bound or claimed. Returns whether
    /// the pod was enqueued.
    #[tracing::instrument(name = "WorkQueue::append", skip_all, fields(
        pod = %pod.key()
    ))]
    pub async fn append(&self, pod: Pod) -> Result<bool, SendError<Pod>> {
        if pod.is_bound() || !self.claim(pod.uid) {
            return Ok(false);
        }

        let uid = pod.uid;
        if let Err(error) = self.tx.send(pod).await {
            self.release(uid);
            return Err(error);
        }

        Ok(true)
    }

    #[tracing::instrument(name = "WorkQueue::next", skip_all)]
    pub async fn next(&self) -> Option<Pod> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    /// Releases the claim on a pod whose decision did not end in a bind so a
    /// later event can schedule it again.
    pub fn release(&self, uid: PodUid) {
        self.claims().remove(&uid);
    }

    /// Forgets a deleted pod.
    pub fn forget(&self, uid: PodUid) {
        self.release(uid);
    }

    pub fn is_claimed(&self, uid: PodUid) -> bool {
        self.claims().contains(&uid)
    }

    fn claim(&self, uid: PodUid) -> bool {
        self.claims().insert(uid)
    }

    fn claims(&self) -> std::sync::MutexGuard<'_, HashSet<PodUid>> {
        self.claimed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
