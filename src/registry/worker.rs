//! Quota mutation worker
//!
//! Every registry and quota mutation runs on one task fed by a bounded
//! queue, so a read-allocate-append can never interleave with another
//! mutation. Submissions beyond the queue capacity fail immediately rather
//! than blocking the caller.

use log::error;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

use crate::backend::XfsBackend;
use crate::error::ServiceError;

use super::store::ProjectStore;

/// A queued mutation
#[derive(Debug)]
pub enum MutationJob {
    Set { path: PathBuf, bytes: u64 },
    Remove { path: PathBuf },
    /// Resolves once every job queued before it has been processed
    Flush(oneshot::Sender<()>),
}

/// Handle for submitting mutations to the worker task
#[derive(Debug, Clone)]
pub struct QuotaWorker {
    tx: mpsc::Sender<MutationJob>,
}

impl QuotaWorker {
    /// Spawn the worker task that owns the store and backend
    pub fn spawn(store: ProjectStore, backend: XfsBackend, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        tokio::spawn(run_worker(rx, store, backend));
        QuotaWorker { tx }
    }

    /// Queue a quota upsert. Fails fast when the queue is full.
    pub fn submit_set(&self, path: PathBuf, bytes: u64) -> Result<(), ServiceError> {
        self.submit(MutationJob::Set { path, bytes })
    }

    /// Queue a quota removal. Fails fast when the queue is full.
    pub fn submit_remove(&self, path: PathBuf) -> Result<(), ServiceError> {
        self.submit(MutationJob::Remove { path })
    }

    fn submit(&self, job: MutationJob) -> Result<(), ServiceError> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ServiceError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ServiceError::QueueClosed,
        })
    }

    /// Wait until every mutation queued so far has been processed.
    ///
    /// Unlike the mutation submissions this waits for queue space, since its
    /// whole point is quiescence.
    pub async fn flush(&self) -> Result<(), ServiceError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(MutationJob::Flush(tx))
            .await
            .map_err(|_| ServiceError::QueueClosed)?;
        rx.await.map_err(|_| ServiceError::QueueClosed)
    }
}

/// Processes jobs in submission order.
///
/// Failed mutations are logged and dropped; the caller already moved on and
/// the next apply pass retries the quota implicitly.
async fn run_worker(mut rx: mpsc::Receiver<MutationJob>, store: ProjectStore, backend: XfsBackend) {
    while let Some(job) = rx.recv().await {
        match job {
            MutationJob::Set { path, bytes } => {
                if let Err(e) = backend.set_quota(&store, &path, bytes).await {
                    error!("Error setting quota {} on {}: {}", bytes, path.display(), e);
                }
            }
            MutationJob::Remove { path } => {
                if let Err(e) = backend.remove_quota(&store, &path).await {
                    error!("Error removing quota on {}: {}", path.display(), e);
                }
            }
            MutationJob::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
