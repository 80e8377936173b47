use crate::backend::{self, Backends};

use super::saga::{Resource, ResourceKind};

pub(crate) use deprovision::deprovision;
pub(crate) use provision::{provision, ProvisionError};

/// Deletes one provisioned resource on its owning back-end.
pub(crate) async fn delete(backends: &Backends, resource: &Resource) -> Result<(), backend::Error> {
    let id = resource.id.as_str();

    match resource.kind {
        ResourceKind::IngestInput => backends.ingest.delete_input(id).await,
        ResourceKind::TranscodeChannel => backends.ingest.delete_channel(id).await,
        ResourceKind::PackagingChannel => backends.packaging.delete_channel(id).await,
        ResourceKind::OriginEndpoint => backends.packaging.delete_origin_endpoint(id).await,
        ResourceKind::Distribution => backends.distribution.delete_distribution(id).await,
    }
}

mod deprovision;
mod provision;
