//! Single-flight command queue
//!
//! Each session runs its network operations through one worker task, so a
//! second `project` is not sent before the first has been answered. Jobs
//! run strictly one at a time in submission order.
//!
//! Jobs belong to a generation. [`CommandQueue::abort_all`] cancels the
//! current generation: the running job and every job already queued
//! resolve with [`Error::Cancelled`]. Jobs submitted afterwards run
//! normally.
//!
//! A job that panics takes the worker down; its caller and every later
//! caller get [`Error::Internal`].

use std::future::Future;
use std::pin::Pin;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// FIFO worker for session operations
pub struct CommandQueue {
    name: &'static str,
    tx: mpsc::UnboundedSender<Job>,
    generation: Mutex<CancellationToken>,
    worker: JoinHandle<()>,
}

impl CommandQueue {
    /// Start the worker task
    pub fn spawn(name: &'static str) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
            tracing::trace!(queue = name, "Command queue worker stopped");
        });

        Self {
            name,
            tx,
            generation: Mutex::new(CancellationToken::new()),
            worker,
        }
    }

    /// Run `op` after every previously submitted job has resolved
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let token = self.generation.lock().clone();

        let job = async move {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => Err(Error::Cancelled),
                result = op => result,
            };
            let _ = reply_tx.send(result);
        };

        self.tx.send(Box::pin(job)).map_err(|_| worker_stopped())?;

        reply_rx.await.unwrap_or_else(|_| {
            tracing::error!(queue = self.name, "Command worker stopped mid-job");
            Err(worker_stopped())
        })
    }

    /// Cancel the running job and everything queued behind it
    pub fn abort_all(&self) {
        let mut generation = self.generation.lock();
        generation.cancel();
        *generation = CancellationToken::new();
        tracing::debug!(queue = self.name, "Command queue aborted");
    }

    /// Wait until every job submitted before this call has resolved
    pub async fn drain(&self) {
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let barrier = async move {
            let _ = done_tx.send(());
        };
        if self.tx.send(Box::pin(barrier)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

fn worker_stopped() -> Error {
    Error::Internal("command worker stopped".into())
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        self.generation.lock().cancel();
        self.worker.abort();
    }
}
