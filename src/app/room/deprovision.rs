use tracing::{info, instrument, warn};

use crate::{
    app::{
        context::GlobalContext,
        saga::{Resource, ResourceKind},
    },
    db::room,
};

/// Tears down the resources recorded on a deleted room.
///
/// Deletes run transcode channel first, packaging channel next, distribution last.
/// Absent ids are skipped and failures are logged, so this never fails.
#[instrument(skip(ctx, room), fields(room_id = %room.id))]
pub(crate) async fn deprovision<C: GlobalContext>(ctx: &C, room: &room::Object) {
    let recorded = [
        (ResourceKind::TranscodeChannel, &room.transcode_channel_id),
        (ResourceKind::PackagingChannel, &room.packaging_channel_id),
        (ResourceKind::Distribution, &room.distribution_id),
    ];

    for (kind, id) in recorded.iter() {
        let resource = match id {
            Some(id) => Resource::new(*kind, id),
            None => continue,
        };

        match super::delete(ctx.backends(), &resource).await {
            Ok(()) => {
                info!(%resource, "Deleted resource");
                ctx.metrics().observe_deprovision_delete(true);
            }
            Err(err) => {
                warn!(%resource, error = %err, "Failed to delete resource");
                ctx.metrics().observe_deprovision_delete(false);
            }
        }
    }
}
