use derive_more::Display;
use reqwest::Url;
use tracing::{error, info, instrument, warn};

use crate::{
    app::{
        context::GlobalContext,
        saga::{Resource, ResourceKind, Saga},
    },
    backend::{self, Backends, MediaMode},
    db::{self, room},
};

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub(crate) enum Step {
    #[display(fmt = "security_group")]
    SecurityGroup,
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
    #[display(fmt = "session")]
    Session,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ProvisionError {
    /// A back-end call failed; everything created before it has been compensated.
    #[error("failed to provision {step}: {source}")]
    Step {
        step: Step,
        #[source]
        source: backend::Error,
    },
    /// Every resource was created but the room record could not be written.
    #[error("failed to record provisioned resources: {source}")]
    Persistence {
        #[source]
        source: db::Error,
    },
}

trait StepExt<T> {
    fn step(self, step: Step) -> Result<T, ProvisionError>;
}

impl<T> StepExt<T> for Result<T, backend::Error> {
    fn step(self, step: Step) -> Result<T, ProvisionError> {
        self.map_err(|source| ProvisionError::Step { step, source })
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Creates the whole media pipeline for a room and records it in one update.
///
/// On failure every resource created by this attempt is deleted newest first,
/// so a redelivered event starts from a clean slate.
#[instrument(skip(ctx, room_id), fields(room_id = %room_id))]
pub(crate) async fn provision<C: GlobalContext>(
    ctx: &C,
    room_id: &room::Id,
    name: &str,
) -> Result<room::Provisioning, ProvisionError> {
    let timer = ctx.metrics().provisioning_duration.start_timer();
    let mut saga = Saga::new();

    let result = match create_resources(ctx.backends(), name, &mut saga).await {
        Ok(provisioning) => match ctx.store().update_room(room_id, &provisioning).await {
            Ok(()) => {
                saga.commit();
                info!(hls_uri = %provisioning.hls_uri, "Room provisioned");
                Ok(provisioning)
            }
            Err(source) => {
                error!(
                    error = %source,
                    ingest_input_id = %provisioning.ingest_input_id,
                    transcode_channel_id = %provisioning.transcode_channel_id,
                    packaging_channel_id = %provisioning.packaging_channel_id,
                    origin_endpoint_id = %provisioning.origin_endpoint_id,
                    distribution_id = %provisioning.distribution_id,
                    session_id = %provisioning.session_id,
                    "Provisioned resources were not recorded, rolling back"
                );

                ctx.metrics().observe_compensation(saga.compensate().await);
                Err(ProvisionError::Persistence { source })
            }
        },
        Err(err) => {
            warn!(
                error = %err,
                created = ?saga.resources(),
                "Provisioning failed, rolling back"
            );
            ctx.metrics().observe_compensation(saga.compensate().await);
            Err(err)
        }
    };

    timer.observe_duration();
    ctx.metrics().observe_provisioning(&result);
    result
}

async fn create_resources<'a>(
    backends: &'a Backends,
    name: &str,
    saga: &mut Saga<'a, backend::Error>,
) -> Result<room::Provisioning, ProvisionError> {
    let security_group_id = backends
        .ingest
        .create_or_get_security_group()
        .await
        .step(Step::SecurityGroup)?;

    let input = backends
        .ingest
        .create_input(name, &security_group_id)
        .await
        .step(Step::IngestInput)?;
    track(saga, backends, ResourceKind::IngestInput, &input.id);
    info!(ingest_input_id = %input.id, %security_group_id, "Created ingest input");

    let packaging_channel_id = backends
        .packaging
        .create_channel(name)
        .await
        .step(Step::PackagingChannel)?;
    track(saga, backends, ResourceKind::PackagingChannel, &packaging_channel_id);
    info!(%packaging_channel_id, "Created packaging channel");

    let transcode_channel_id = backends
        .ingest
        .create_channel(name, &input.id, &packaging_channel_id)
        .await
        .step(Step::TranscodeChannel)?;
    track(saga, backends, ResourceKind::TranscodeChannel, &transcode_channel_id);
    // Deleting the channel deletes its attached input once the channel is gone.
    saga.release(&Resource::new(ResourceKind::IngestInput, &input.id));
    info!(%transcode_channel_id, "Created transcode channel");

    let endpoint = backends
        .packaging
        .create_origin_endpoint(name, &packaging_channel_id)
        .await
        .step(Step::OriginEndpoint)?;
    track(saga, backends, ResourceKind::OriginEndpoint, &endpoint.id);
    info!(origin_endpoint_id = %endpoint.id, uri = %endpoint.uri, "Created origin endpoint");

    let origin_host = origin_host(&endpoint.uri).step(Step::OriginEndpoint)?;

    let distribution = backends
        .distribution
        .create_distribution(name, &origin_host)
        .await
        .step(Step::Distribution)?;
    track(saga, backends, ResourceKind::Distribution, &distribution.id);
    info!(distribution_id = %distribution.id, domain = %distribution.domain, "Created distribution");

    let hls_uri = playback_uri(&endpoint.uri, &distribution.domain).step(Step::Distribution)?;

    let session_id = backends
        .realtime
        .create_session(MediaMode::Routed)
        .await
        .step(Step::Session)?;
    info!(%session_id, "Created realtime session");

    Ok(room::Provisioning {
        ingest_input_id: input.id,
        rtmp_uri: input.rtmp_uri,
        transcode_channel_id,
        packaging_channel_id,
        origin_endpoint_id: endpoint.id,
        origin_endpoint_uri: endpoint.uri,
        distribution_id: distribution.id,
        distribution_domain: distribution.domain,
        session_id,
        hls_uri,
    })
}

fn track<'a>(
    saga: &mut Saga<'a, backend::Error>,
    backends: &'a Backends,
    kind: ResourceKind,
    id: &str,
) {
    let resource = Resource::new(kind, id);

    saga.push(resource.clone(), move || async move {
        super::delete(backends, &resource).await
    });
}

fn origin_host(origin_endpoint_uri: &str) -> Result<String, backend::Error> {
    let uri = Url::parse(origin_endpoint_uri).map_err(backend::Error::build)?;

    uri.host_str()
        .map(ToOwned::to_owned)
        .ok_or(backend::Error::MissingField("OriginEndpoint.Url.Host"))
}

/// The origin endpoint URI served through the distribution domain.
fn playback_uri(origin_endpoint_uri: &str, distribution_domain: &str) -> Result<String, backend::Error> {
    let mut uri = Url::parse(origin_endpoint_uri).map_err(backend::Error::build)?;
    uri.set_host(Some(distribution_domain))
        .map_err(backend::Error::build)?;

    Ok(uri.into())
}
