use std::net::SocketAddr;

use axum::{extract::Extension, http::StatusCode, routing::get, Router};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing::{error, info};

use super::{room::ProvisionError, saga::Compensated};

pub(crate) struct Metrics {
    pub(crate) provisioning_duration: Histogram,
    provisioning_ok: IntCounter,
    provisioning_step_failed: IntCounter,
    provisioning_persistence_failed: IntCounter,
    compensation_ok: IntCounter,
    pub(crate) compensation_failed: IntCounter,
    deprovision_delete_ok: IntCounter,
    deprovision_delete_failed: IntCounter,
    webhook_events: IntCounterVec,
    pub(crate) broadcasts_started: IntCounter,
}

impl Metrics {
    pub(crate) fn new(registry: &Registry) -> anyhow::Result<Self> {
        let provisioning_duration = Histogram::with_opts(
            HistogramOpts::new("provisioning_duration", "Room provisioning duration")
                .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
        )?;
        let provisioning = IntCounterVec::new(
            Opts::new("provisioning_total", "Room provisioning outcomes"),
            &["status"],
        )?;
        let compensations = IntCounterVec::new(
            Opts::new("compensations_total", "Compensating deletes"),
            &["status"],
        )?;
        let deprovision_deletes = IntCounterVec::new(
            Opts::new("deprovision_deletes_total", "Deprovisioning deletes"),
            &["status"],
        )?;
        let webhook_events = IntCounterVec::new(
            Opts::new("webhook_events_total", "Realtime session webhook events"),
            &["kind"],
        )?;
        let broadcasts_started =
            IntCounter::new("broadcasts_started_total", "Broadcasts started by the relay")?;

        registry.register(Box::new(provisioning_duration.clone()))?;
        registry.register(Box::new(provisioning.clone()))?;
        registry.register(Box::new(compensations.clone()))?;
        registry.register(Box::new(deprovision_deletes.clone()))?;
        registry.register(Box::new(webhook_events.clone()))?;
        registry.register(Box::new(broadcasts_started.clone()))?;

        Ok(Self {
            provisioning_duration,
            provisioning_ok: provisioning.get_metric_with_label_values(&["ok"])?,
            provisioning_step_failed: provisioning.get_metric_with_label_values(&["step_failed"])?,
            provisioning_persistence_failed: provisioning
                .get_metric_with_label_values(&["persistence_failed"])?,
            compensation_ok: compensations.get_metric_with_label_values(&["ok"])?,
            compensation_failed: compensations.get_metric_with_label_values(&["failed"])?,
            deprovision_delete_ok: deprovision_deletes.get_metric_with_label_values(&["ok"])?,
            deprovision_delete_failed: deprovision_deletes
                .get_metric_with_label_values(&["failed"])?,
            webhook_events,
            broadcasts_started,
        })
    }

    pub(crate) fn observe_provisioning<T>(&self, result: &Result<T, ProvisionError>) {
        match result {
            Ok(_) => self.provisioning_ok.inc(),
            Err(ProvisionError::Step { .. }) => self.provisioning_step_failed.inc(),
            Err(ProvisionError::Persistence { .. }) => self.provisioning_persistence_failed.inc(),
        }
    }

    pub(crate) fn observe_compensation(&self, report: Compensated) {
        self.compensation_ok.inc_by(report.succeeded as u64);
        self.compensation_failed.inc_by(report.failed as u64);
    }

    pub(crate) fn observe_deprovision_delete(&self, succeeded: bool) {
        if succeeded {
            self.deprovision_delete_ok.inc();
        } else {
            self.deprovision_delete_failed.inc();
        }
    }

    pub(crate) fn observe_webhook_event(&self, kind: &str) {
        self.webhook_events.with_label_values(&[kind]).inc();
    }
}

////////////////////////////////////////////////////////////////////////////////

pub(crate) async fn serve(
    bind_address: SocketAddr,
    registry: Registry,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let router = Router::new()
        .route("/metrics", get(render))
        .layer(Extension(registry));

    info!(%bind_address, "Metrics server listening");

    axum::Server::try_bind(&bind_address)?
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn render(Extension(registry): Extension<Registry>) -> (StatusCode, String) {
    let mut buffer = vec![];

    if let Err(err) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        error!(%err, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics".to_owned());
    }

    match String::from_utf8(buffer) {
        Ok(text) => (StatusCode::OK, text),
        Err(err) => {
            error!(%err, "Metrics are not valid utf-8");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics".to_owned())
        }
    }
}
