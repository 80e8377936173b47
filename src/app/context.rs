use std::sync::Arc;

use crate::{backend::Backends, db::RoomStore};

use super::metrics::Metrics;

///////////////////////////////////////////////////////////////////////////////

pub(crate) trait GlobalContext: Sync {
    fn backends(&self) -> &Backends;
    fn store(&self) -> &dyn RoomStore;
    fn metrics(&self) -> &Metrics;
}

///////////////////////////////////////////////////////////////////////////////

#[derive(Clone)]
pub(crate) struct AppContext {
    backends: Backends,
    store: Arc<dyn RoomStore>,
    metrics: Arc<Metrics>,
}

impl AppContext {
    pub(crate) fn new(backends: Backends, store: Arc<dyn RoomStore>, metrics: Arc<Metrics>) -> Self {
        Self {
            backends,
            store,
            metrics,
        }
    }
}

impl GlobalContext for AppContext {
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
