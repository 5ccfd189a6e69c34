//! OffloadWorker - runs a blocking client on its own thread behind a queue

use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument, warn};

use contracts::ContractError;

/// Synchronous client that performs one write per payload
///
/// Implementations may block for as long as the write takes; they are only
/// ever called from the worker thread.
pub trait BlockingWriter: Send + 'static {
    fn write(&mut self, payload: &str) -> Result<(), ContractError>;
}

struct WriteJob {
    payload: String,
    reply: oneshot::Sender<Result<(), ContractError>>,
}

/// Handle to a running offload worker
///
/// The writer is created, used and dropped on the worker thread. Dropping the
/// handle closes the queue; the thread exits once pending writes are done.
pub struct OffloadWorker {
    /// Worker name
    name: String,
    /// Channel to send jobs to the worker
    tx: mpsc::Sender<WriteJob>,
}

impl OffloadWorker {
    /// Spawn the worker thread and build the writer on it
    ///
    /// Resolves once the writer is constructed. A factory error is returned
    /// as-is and the thread exits.
    #[instrument(name = "offload_worker_start", skip_all)]
    pub async fn start<W, F>(
        name: impl Into<String>,
        queue_capacity: usize,
        factory: F,
    ) -> Result<Self, ContractError>
    where
        W: BlockingWriter,
        F: FnOnce() -> Result<W, ContractError> + Send + 'static,
    {
        let name = name.into();

        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let (init_tx, init_rx) = oneshot::channel();
        let worker_name = name.clone();

        thread::Builder::new()
            .name(format!("offload-{name}"))
            .spawn(move || {
                let writer = match factory() {
                    Ok(writer) => {
                        let _ = init_tx.send(Ok(()));
                        writer
                    }
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };
                offload_loop(writer, rx, &worker_name);
            })?;

        match init_rx.await {
            Ok(Ok(())) => {
                debug!(worker = %name, "Offload worker ready");
                Ok(Self { name, tx })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ContractError::backend_connection(
                &name,
                "offload worker exited during initialization",
            )),
        }
    }

    /// Get worker name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free slots in the job queue
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }

    /// Run one write on the worker thread and wait for its outcome
    pub async fn submit(&self, payload: String) -> Result<(), ContractError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = WriteJob {
            payload,
            reply: reply_tx,
        };

        self.tx
            .send(job)
            .await
            .map_err(|_| ContractError::backend_write(&self.name, "offload worker stopped"))?;

        reply_rx.await.map_err(|_| {
            ContractError::backend_write(&self.name, "offload worker dropped the write")
        })?
    }
}

/// Worker loop that drains the queue on the dedicated thread
fn offload_loop<W: BlockingWriter>(
    mut writer: W,
    mut rx: mpsc::Receiver<WriteJob>,
    name: &str,
) {
    debug!(worker = %name, "Offload worker started");

    while let Some(job) = rx.blocking_recv() {
        let result = writer.write(&job.payload);
        if let Err(ref e) = result {
            warn!(worker = %name, error = %e, "Offloaded write failed");
        }
        if job.reply.send(result).is_err() {
            debug!(worker = %name, "Caller went away before the write completed");
        }
    }

    debug!(worker = %name, "Offload worker stopped");
}
