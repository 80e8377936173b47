use async_trait::async_trait;
use aws_sdk_mediapackage::{
    types::{AdMarkers, HlsPackage, Origination, PlaylistType, StreamOrder, StreamSelection},
    Client,
};
use tracing::warn;

use super::{profile::PackagingProfile, Error, OriginEndpoint, PackagingClient};
use crate::id;

const ROOM_NAME_TAG: &str = "roomName";

#[derive(Clone)]
pub struct MediaPackageClient {
    client: Client,
    profile: PackagingProfile,
}

impl MediaPackageClient {
    pub fn new(config: &aws_config::SdkConfig, profile: PackagingProfile) -> Self {
        Self {
            client: Client::new(config),
            profile,
        }
    }

    fn hls_package(&self) -> HlsPackage {
        HlsPackage::builder()
            .ad_markers(AdMarkers::None)
            .include_iframe_only_stream(false)
            .playlist_type(PlaylistType::Event)
            .playlist_window_seconds(self.profile.playlist_window_seconds)
            .program_date_time_interval_seconds(0)
            .segment_duration_seconds(self.profile.segment_duration_seconds)
            .stream_selection(
                StreamSelection::builder()
                    .max_video_bits_per_second(i32::MAX)
                    .min_video_bits_per_second(0)
                    .stream_order(StreamOrder::Original)
                    .build(),
            )
            .use_audio_rendition_group(false)
            .build()
    }
}

#[async_trait]
impl PackagingClient for MediaPackageClient {
    async fn create_channel(&self, label: &str) -> Result<String, Error> {
        let output = self
            .client
            .create_channel()
            .id(id::resource_id())
            .tags(ROOM_NAME_TAG, id::tag_value(label))
            .send()
            .await
            .map_err(Error::sdk)?;

        output
            .id()
            .map(ToOwned::to_owned)
            .ok_or(Error::MissingField("Channel.Id"))
    }

    async fn create_origin_endpoint(
        &self,
        label: &str,
        channel_id: &str,
    ) -> Result<OriginEndpoint, Error> {
        let output = self
            .client
            .create_origin_endpoint()
            .id(id::resource_id())
            .channel_id(channel_id)
            .tags(ROOM_NAME_TAG, id::tag_value(label))
            .hls_package(self.hls_package())
            .origination(Origination::Allow)
            .startover_window_seconds(self.profile.startover_window_seconds)
            .time_delay_seconds(0)
            .send()
            .await
            .map_err(Error::sdk)?;

        match (output.id(), output.url()) {
            (Some(id), Some(uri)) => Ok(OriginEndpoint {
                id: id.to_owned(),
                uri: uri.to_owned(),
            }),
            (None, _) => Err(Error::MissingField("OriginEndpoint.Id")),
            (_, None) => Err(Error::MissingField("OriginEndpoint.Url")),
        }
    }

    async fn delete_origin_endpoint(&self, endpoint_id: &str) -> Result<(), Error> {
        self.client
            .delete_origin_endpoint()
            .id(endpoint_id)
            .send()
            .await
            .map_err(Error::sdk)?;

        Ok(())
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), Error> {
        let endpoints = self
            .client
            .list_origin_endpoints()
            .channel_id(channel_id)
            .send()
            .await
            .map_err(Error::sdk)?;

        for endpoint_id in endpoints.origin_endpoints().iter().filter_map(|e| e.id()) {
            if let Err(err) = self.delete_origin_endpoint(endpoint_id).await {
                warn!(%channel_id, %endpoint_id, %err, "Failed to delete origin endpoint");
            }
        }

        self.client
            .delete_channel()
            .id(channel_id)
            .send()
            .await
            .map_err(Error::sdk)?;

        Ok(())
    }
}
