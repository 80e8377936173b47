use std::{future::Future, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{task::JoinHandle, time::Instant};
use tracing::{info, warn};

/// Deletes that finish after the call that started them returned.
///
/// Shared by the clients whose resources need to settle before they can be removed.
/// Shutdown waits for them through [`PendingDeletes::drain`].
#[derive(Clone, Default)]
pub struct PendingDeletes {
    tasks: Arc<Mutex<Vec<(String, JoinHandle<()>)>>>,
}

impl PendingDeletes {
    pub fn spawn<F>(&self, resource: impl Into<String>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);

        let mut tasks = self.tasks.lock();
        tasks.retain(|(_resource, handle)| !handle.is_finished());
        tasks.push((resource.into(), handle));
    }

    /// Waits up to `timeout` for every delete still running and aborts the rest.
    ///
    /// Returns the number of deletes that did not finish.
    pub async fn drain(&self, timeout: Duration) -> usize {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let deadline = Instant::now() + timeout;
        let mut unfinished = 0;

        for (resource, mut handle) in tasks {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
                warn!(%resource, "Delete did not finish before shutdown, resource may linger");
                unfinished += 1;
            }
        }

        if unfinished == 0 {
            info!("Pending deletes finished");
        }

        unfinished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_waits_for_running_deletes() {
        let pending = PendingDeletes::default();
        let (tx, rx) = tokio::sync::oneshot::channel();

        pending.spawn("distribution/E1", async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(()).ok();
        });

        assert_eq!(pending.drain(Duration::from_secs(5)).await, 0);
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn drain_reports_deletes_that_outlive_the_timeout() {
        let pending = PendingDeletes::default();
        pending.spawn("channel/7654321", futures::future::pending::<()>());
        pending.spawn("distribution/E1", async {});

        assert_eq!(pending.drain(Duration::from_millis(50)).await, 1);
        assert_eq!(pending.drain(Duration::from_millis(50)).await, 0);
    }
}
