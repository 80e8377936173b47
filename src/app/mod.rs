use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use aws_config::{BehaviorVersion, Region};
use futures::StreamExt;
use prometheus::Registry;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::backend::{
    cloudfront::CloudFrontClient, medialive::MediaLiveClient, mediapackage::MediaPackageClient,
    opentok::OpentokClient, pending::PendingDeletes, Backends,
};
use crate::config::{self, Config};
use crate::db::graphql::GraphqlClient;
use context::AppContext;
use metrics::Metrics;

////////////////////////////////////////////////////////////////////////////////

pub(crate) async fn run() -> Result<()> {
    // Config
    let config = config::load().context("Failed to load config")?;
    info!(
        listener_address = %config.http.listener_address,
        graphql_url = %config.graphql.url,
        "App config loaded"
    );

    // Sentry
    if let Some(sentry_config) = config.sentry.as_ref() {
        svc_error::extension::sentry::init(sentry_config);
    }

    // Back-ends
    let pending_deletes = PendingDeletes::default();
    let backends = build_backends(&config, &pending_deletes).await;
    let store = Arc::new(GraphqlClient::new(&config.graphql));

    // Metrics
    let registry = Registry::new();
    let metrics = Arc::new(Metrics::new(&registry).context("Failed to register metrics")?);

    // Context
    let context = Arc::new(AppContext::new(backends, store, metrics));

    // Shutdown on SIGTERM/SIGINT
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let mut signals = Signals::new(&[SIGTERM, SIGINT]).context("Failed to register signals")?;
    let signals_handle = signals.handle();

    let signals_task = tokio::spawn(async move {
        if let Some(signal) = signals.next().await {
            info!(signal, "Received signal, shutting down");
        }

        if shutdown_tx.send(()).is_err() {
            warn!("Servers are already stopped");
        }
    });

    // Metrics server
    let metrics_server = config.metrics.as_ref().map(|metrics_config| {
        tokio::spawn(metrics::serve(
            metrics_config.http.bind_address,
            registry.clone(),
            shutdown_signal(shutdown_rx.clone()),
        ))
    });

    // HTTP server
    let router = http::build_router(context);
    info!(address = %config.http.listener_address, "HTTP server listening");

    axum::Server::try_bind(&config.http.listener_address)
        .context("Failed to bind HTTP listener")?
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await
        .context("HTTP server failed")?;

    signals_handle.close();
    signals_task.await.context("Signal handler panicked")?;

    if let Some(metrics_server) = metrics_server {
        metrics_server
            .await
            .context("Metrics server panicked")?
            .context("Metrics server failed")?;
    }

    let unfinished = pending_deletes
        .drain(config.shutdown.pending_deletes_timeout)
        .await;
    if unfinished > 0 {
        warn!(unfinished, "Stopped with unfinished deletes");
    }

    info!("Stopped");
    Ok(())
}

async fn build_backends(config: &Config, pending_deletes: &PendingDeletes) -> Backends {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = config.aws.region.clone() {
        loader = loader.region(Region::new(region));
    }
    let aws = loader.load().await;

    Backends {
        ingest: Arc::new(MediaLiveClient::new(
            &aws,
            config.aws.medialive_role_arn.clone(),
            config.profile.transcode.clone(),
            config.channel.clone(),
            pending_deletes.clone(),
        )),
        packaging: Arc::new(MediaPackageClient::new(
            &aws,
            config.profile.packaging.clone(),
        )),
        distribution: Arc::new(CloudFrontClient::new(
            &aws,
            config.profile.cache.clone(),
            config.distribution.clone(),
            pending_deletes.clone(),
        )),
        realtime: Arc::new(OpentokClient::new(&config.opentok)),
    }
}

async fn shutdown_signal(mut rx: watch::Receiver<()>) {
    if rx.changed().await.is_err() {
        warn!("Shutdown channel closed");
    }
}

pub(crate) mod context;
pub(crate) mod endpoint;
pub(crate) mod error;
pub(crate) mod http;
pub(crate) mod metrics;
pub(crate) mod relay;
pub(crate) mod room;
pub(crate) mod saga;
pub(crate) mod token;
