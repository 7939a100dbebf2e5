use common::{Error, Result};
use std::any::Any;
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::warn;

/// How long an aborted task gets to unwind before it is left detached.
const ABORT_GRACE: Duration = Duration::from_millis(250);

/// Runs one search call in its own task under a hard deadline, so a call that
/// never returns cannot stall the dataset loop.
#[derive(Debug, Clone, Copy)]
pub struct BoundedProbeRunner {
    timeout: Duration,
}

impl BoundedProbeRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Errors from `search_fn` come back unchanged. On timeout the task is
    /// aborted and given a short grace period to unwind; a task stuck in
    /// blocking code is detached. Either way [`Error::ProbeTimeout`] is
    /// returned no later than the deadline plus that grace period.
    pub async fn run<Q, F, Fut, T>(&self, search_fn: F, query: Q) -> Result<T>
    where
        F: FnOnce(Q) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let call = search_fn(query);

        let handle = tokio::spawn(async move {
            // The receiver is gone only if the caller already gave up.
            let _ = tx.send(call.await);
        });

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Probe task failed after delivering its result");
                }
                result
            }
            Ok(Err(_)) => match handle.await {
                Err(e) => Err(task_failure(e)),
                Ok(()) => Err(Error::Probe("probe task ended without a result".to_string())),
            },
            Err(_) => {
                handle.abort();
                // Abort only lands at the next await point.
                if tokio::time::timeout(ABORT_GRACE, handle).await.is_err() {
                    warn!(timeout = ?self.timeout, "Timed out task did not unwind, detaching it");
                }
                Err(Error::ProbeTimeout(self.timeout))
            }
        }
    }
}

fn task_failure(err: JoinError) -> Error {
    if err.is_panic() {
        Error::Probe(panic_message(err.into_panic()))
    } else {
        Error::Probe(format!("probe task cancelled: {}", err))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "probe task panicked".to_string()
    }
}
