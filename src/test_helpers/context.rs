use std::sync::Arc;

use prometheus::Registry;

use super::{
    backends::{FakeDistribution, FakeIngest, FakePackaging, FakeRealtime, Journal},
    store::InMemoryRoomStore,
};
use crate::{
    app::{
        context::{AppContext, GlobalContext},
        metrics::Metrics,
    },
    backend::Backends,
    db::RoomStore,
};

pub(crate) struct TestContext {
    pub(crate) journal: Arc<Journal>,
    pub(crate) ingest: Arc<FakeIngest>,
    pub(crate) realtime: Arc<FakeRealtime>,
    pub(crate) store: Arc<InMemoryRoomStore>,
    backends: Backends,
    metrics: Arc<Metrics>,
}

impl TestContext {
    pub(crate) fn new() -> Self {
        let journal = Arc::new(Journal::default());
        let ingest = Arc::new(FakeIngest::new(journal.clone()));
        let realtime = Arc::new(FakeRealtime::new(journal.clone()));
        let store = Arc::new(InMemoryRoomStore::new(journal.clone()));

        let backends = Backends {
            ingest: ingest.clone(),
            packaging: Arc::new(FakePackaging::new(journal.clone())),
            distribution: Arc::new(FakeDistribution::new(journal.clone())),
            realtime: realtime.clone(),
        };

        let metrics = Metrics::new(&Registry::new()).expect("failed to register metrics");

        Self {
            journal,
            ingest,
            realtime,
            store,
            backends,
            metrics: Arc::new(metrics),
        }
    }

    pub(crate) fn app_context(&self) -> AppContext {
        AppContext::new(
            self.backends.clone(),
            self.store.clone(),
            self.metrics.clone(),
        )
    }
}

impl GlobalContext for TestContext {
    fn backends(&self) -> &Backends {
        &self.backends
    }

    fn store(&self) -> &dyn RoomStore {
        self.store.as_ref()
    }

    fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
