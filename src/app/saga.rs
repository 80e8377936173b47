use std::fmt;

use derive_more::Display;
use futures::future::{BoxFuture, Future, FutureExt};
use tracing::{info, warn};

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub(crate) enum ResourceKind {
    #[display(fmt = "ingest_input")]
    IngestInput,
    #[display(fmt = "packaging_channel")]
    PackagingChannel,
    #[display(fmt = "transcode_channel")]
    TranscodeChannel,
    #[display(fmt = "origin_endpoint")]
    OriginEndpoint,
    #[display(fmt = "distribution")]
    Distribution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resource {
    pub(crate) kind: ResourceKind,
    pub(crate) id: String,
}

impl Resource {
    pub(crate) fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

////////////////////////////////////////////////////////////////////////////////

type Undo<'a, E> = Box<dyn FnOnce() -> BoxFuture<'a, Result<(), E>> + Send + 'a>;

struct Compensation<'a, E> {
    resource: Resource,
    undo: Undo<'a, E>,
}

/// Stack of compensating actions for one multi-step operation.
///
/// Each successful create pushes its undo. On failure `compensate` pops and runs them
/// newest first; undo failures are logged and never surface to the caller.
pub(crate) struct Saga<'a, E> {
    stack: Vec<Compensation<'a, E>>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Compensated {
    pub(crate) succeeded: usize,
    pub(crate) failed: usize,
}

impl<'a, E> Saga<'a, E>
where
    E: fmt::Display + Send + 'a,
{
    pub(crate) fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub(crate) fn push<F, Fut>(&mut self, resource: Resource, undo: F)
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<(), E>> + Send + 'a,
    {
        self.stack.push(Compensation {
            resource,
            undo: Box::new(move || undo().boxed()),
        });
    }

    /// Resources created so far, oldest first.
    pub(crate) fn resources(&self) -> Vec<&Resource> {
        self.stack
            .iter()
            .map(|compensation| &compensation.resource)
            .collect()
    }

    /// Forgets the undo of a resource that a newer compensation already removes.
    pub(crate) fn release(&mut self, resource: &Resource) -> bool {
        let before = self.stack.len();
        self.stack
            .retain(|compensation| compensation.resource != *resource);
        self.stack.len() != before
    }

    /// Drops every compensation once the operation has succeeded.
    pub(crate) fn commit(self) {
        drop(self.stack);
    }

    pub(crate) async fn compensate(mut self) -> Compensated {
        let mut report = Compensated::default();

        while let Some(Compensation { resource, undo }) = self.stack.pop() {
            match undo().await {
                Ok(()) => {
                    info!(kind = %resource.kind, id = %resource.id, "Compensated resource");
                    report.succeeded += 1;
                }
                Err(err) => {
                    warn!(
                        kind = %resource.kind,
                        id = %resource.id,
                        error = %err,
                        "Failed to compensate resource"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn journal() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn push_undo<'a>(
        saga: &mut Saga<'a, String>,
        journal: &Arc<Mutex<Vec<String>>>,
        kind: ResourceKind,
        id: &str,
        fail: bool,
    ) {
        let journal = journal.clone();
        let record = id.to_owned();

        saga.push(Resource::new(kind, id), move || async move {
            journal.lock().expect("journal lock").push(record.clone());

            if fail {
                Err(format!("{} is gone", record))
            } else {
                Ok(())
            }
        });
    }

    #[tokio::test]
    async fn compensates_in_reverse_order() {
        let calls = journal();
        let mut saga = Saga::new();
        push_undo(&mut saga, &calls, ResourceKind::IngestInput, "input", false);
        push_undo(&mut saga, &calls, ResourceKind::PackagingChannel, "package", false);
        push_undo(&mut saga, &calls, ResourceKind::TranscodeChannel, "channel", false);

        let report = saga.compensate().await;

        assert_eq!(
            *calls.lock().expect("journal lock"),
            vec!["channel", "package", "input"]
        );
        assert_eq!(report, Compensated { succeeded: 3, failed: 0 });
    }

    #[tokio::test]
    async fn failed_undo_does_not_stop_the_rest() {
        let calls = journal();
        let mut saga = Saga::new();
        push_undo(&mut saga, &calls, ResourceKind::IngestInput, "input", false);
        push_undo(&mut saga, &calls, ResourceKind::PackagingChannel, "package", true);
        push_undo(&mut saga, &calls, ResourceKind::Distribution, "dist", false);

        let report = saga.compensate().await;

        assert_eq!(
            *calls.lock().expect("journal lock"),
            vec!["dist", "package", "input"]
        );
        assert_eq!(report, Compensated { succeeded: 2, failed: 1 });
    }

    #[tokio::test]
    async fn released_resource_is_not_compensated() {
        let calls = journal();
        let mut saga = Saga::new();
        push_undo(&mut saga, &calls, ResourceKind::IngestInput, "input", false);
        push_undo(&mut saga, &calls, ResourceKind::TranscodeChannel, "channel", false);

        assert!(saga.release(&Resource::new(ResourceKind::IngestInput, "input")));
        assert!(!saga.release(&Resource::new(ResourceKind::IngestInput, "input")));

        let report = saga.compensate().await;

        assert_eq!(*calls.lock().expect("journal lock"), vec!["channel"]);
        assert_eq!(report, Compensated { succeeded: 1, failed: 0 });
    }

    #[tokio::test]
    async fn commit_runs_nothing() {
        let calls = journal();
        let mut saga = Saga::new();
        push_undo(&mut saga, &calls, ResourceKind::IngestInput, "input", false);

        assert_eq!(
            saga.resources(),
            vec![&Resource::new(ResourceKind::IngestInput, "input")]
        );

        saga.commit();
        assert!(calls.lock().expect("journal lock").is_empty());
    }
}
