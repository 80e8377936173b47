use async_trait::async_trait;
use aws_sdk_medialive::{
    types::{
        AacCodingMode, AacProfile, AacRateControlMode, AacSettings, AacSpec, AudioCodecSettings,
        AudioDescription, AudioSelector, ChannelClass, ChannelState, EncoderSettings, H264FramerateControl,
        H264GopSizeUnits, H264ParControl, H264Profile, H264RateControlMode, H264ScanType,
        H264Settings, InputAttachment, InputCodec, InputDestinationRequest, InputMaximumBitrate,
        InputResolution, InputSettings, InputSpecification, InputType, InputWhitelistRuleCidr,
        MediaPackageGroupSettings, MediaPackageOutputDestinationSettings,
        MediaPackageOutputSettings, Output, OutputDestination, OutputGroup, OutputGroupSettings,
        OutputLocationRef, OutputSettings, TimecodeConfig, TimecodeConfigSource,
        VideoCodecSettings, VideoDescription,
    },
    Client,
};
use tracing::{error, info, warn};

use super::{pending::PendingDeletes, profile::TranscodeProfile, Error, IngestClient, Input};
use crate::{config::ChannelConfig, id};

// Inbound RTMP is accepted from anywhere.
const ALLOW_ALL_CIDR: &str = "0.0.0.0/0";
const ROOM_NAME_TAG: &str = "roomName";

#[derive(Clone)]
pub struct MediaLiveClient {
    client: Client,
    role_arn: String,
    profile: TranscodeProfile,
    lifecycle: ChannelConfig,
    pending: PendingDeletes,
}

impl MediaLiveClient {
    pub fn new(
        config: &aws_config::SdkConfig,
        role_arn: String,
        profile: TranscodeProfile,
        lifecycle: ChannelConfig,
        pending: PendingDeletes,
    ) -> Self {
        Self {
            client: Client::new(config),
            role_arn,
            profile,
            lifecycle,
            pending,
        }
    }

    /// Polls until the channel is deleted. An unknown channel counts as deleted.
    async fn wait_channel_deleted(&self, channel_id: &str) -> Result<(), Error> {
        for _ in 0..self.lifecycle.delete_poll_attempts {
            match self.client.describe_channel().channel_id(channel_id).send().await {
                Ok(output) if output.state() == Some(&ChannelState::Deleted) => return Ok(()),
                Ok(_) => {}
                Err(err) => {
                    let not_found = err
                        .as_service_error()
                        .map(|err| err.is_not_found_exception())
                        .unwrap_or(false);

                    if not_found {
                        return Ok(());
                    }

                    return Err(Error::sdk(err));
                }
            }

            tokio::time::sleep(self.lifecycle.delete_poll_interval).await;
        }

        Err(Error::DeleteTimedOut(channel_id.to_owned()))
    }

    /// Inputs stay attached while the channel is deleting and cannot be removed before.
    async fn delete_inputs_when_deleted(
        &self,
        channel_id: &str,
        input_ids: &[String],
    ) -> Result<(), Error> {
        self.wait_channel_deleted(channel_id).await?;

        for input_id in input_ids {
            match self.delete_input(input_id).await {
                Ok(()) => info!(%channel_id, %input_id, "Deleted attached input"),
                Err(err) => warn!(%channel_id, %input_id, %err, "Failed to delete attached input"),
            }
        }

        Ok(())
    }

    fn encoder_settings(
        &self,
        destination_id: &str,
        video_name: &str,
        audio_name: &str,
    ) -> EncoderSettings {
        let profile = &self.profile;

        let aac = AacSettings::builder()
            .bitrate(profile.audio_bitrate)
            .coding_mode(AacCodingMode::CodingMode20)
            .profile(AacProfile::Lc)
            .rate_control_mode(AacRateControlMode::Cbr)
            .sample_rate(profile.audio_sample_rate)
            .spec(AacSpec::Mpeg4)
            .build();

        let audio = AudioDescription::builder()
            .name(audio_name)
            .audio_selector_name(&profile.audio_selector_name)
            .codec_settings(AudioCodecSettings::builder().aac_settings(aac).build())
            .build();

        let h264 = H264Settings::builder()
            .bitrate(profile.video_bitrate)
            .framerate_control(H264FramerateControl::Specified)
            .framerate_numerator(profile.framerate_numerator)
            .framerate_denominator(profile.framerate_denominator)
            .gop_size(profile.gop_size)
            .gop_size_units(H264GopSizeUnits::Frames)
            .gop_num_b_frames(profile.gop_num_b_frames)
            .par_control(H264ParControl::Specified)
            .par_numerator(1)
            .par_denominator(1)
            .profile(H264Profile::Main)
            .rate_control_mode(H264RateControlMode::Cbr)
            .scan_type(H264ScanType::Progressive)
            .build();

        let video = VideoDescription::builder()
            .name(video_name)
            .width(profile.width)
            .height(profile.height)
            .sharpness(profile.sharpness)
            .codec_settings(VideoCodecSettings::builder().h264_settings(h264).build())
            .build();

        let output = Output::builder()
            .output_name(&profile.output_name)
            .video_description_name(video_name)
            .audio_description_names(audio_name)
            .output_settings(
                OutputSettings::builder()
                    .media_package_output_settings(MediaPackageOutputSettings::builder().build())
                    .build(),
            )
            .build();

        let group_settings = MediaPackageGroupSettings::builder()
            .destination(
                OutputLocationRef::builder()
                    .destination_ref_id(destination_id)
                    .build(),
            )
            .build();

        let output_group = OutputGroup::builder()
            .name(id::resource_id())
            .outputs(output)
            .output_group_settings(
                OutputGroupSettings::builder()
                    .media_package_group_settings(group_settings)
                    .build(),
            )
            .build();

        let timecode = TimecodeConfig::builder()
            .source(TimecodeConfigSource::Embedded)
            .build();

        EncoderSettings::builder()
            .audio_descriptions(audio)
            .video_descriptions(video)
            .output_groups(output_group)
            .timecode_config(timecode)
            .build()
    }
}

#[async_trait]
impl IngestClient for MediaLiveClient {
    async fn create_or_get_security_group(&self) -> Result<String, Error> {
        let existing = self
            .client
            .list_input_security_groups()
            .send()
            .await
            .map_err(Error::sdk)?;

        if let Some(id) = existing
            .input_security_groups()
            .iter()
            .find_map(|group| group.id())
        {
            return Ok(id.to_owned());
        }

        let created = self
            .client
            .create_input_security_group()
            .whitelist_rules(InputWhitelistRuleCidr::builder().cidr(ALLOW_ALL_CIDR).build())
            .send()
            .await
            .map_err(Error::sdk)?;

        let id = created
            .security_group()
            .and_then(|group| group.id())
            .ok_or(Error::MissingField("SecurityGroup.Id"))?;

        info!(security_group_id = %id, "Created input security group");
        Ok(id.to_owned())
    }

    async fn create_input(&self, label: &str, security_group_id: &str) -> Result<Input, Error> {
        let output = self
            .client
            .create_input()
            .name(id::resource_id())
            .r#type(InputType::RtmpPush)
            .destinations(
                InputDestinationRequest::builder()
                    .stream_name(id::resource_id())
                    .build(),
            )
            .input_security_groups(security_group_id)
            .tags(ROOM_NAME_TAG, id::tag_value(label))
            .send()
            .await
            .map_err(Error::sdk)?;

        let input = output.input().ok_or(Error::MissingField("Input"))?;
        let id = input.id().ok_or(Error::MissingField("Input.Id"))?;
        let rtmp_uri = input
            .destinations()
            .first()
            .and_then(|destination| destination.url())
            .ok_or(Error::MissingField("Input.Destinations.Url"))?;

        Ok(Input {
            id: id.to_owned(),
            rtmp_uri: rtmp_uri.to_owned(),
        })
    }

    async fn create_channel(
        &self,
        label: &str,
        input_id: &str,
        packaging_channel_id: &str,
    ) -> Result<String, Error> {
        let destination_id = id::resource_id();
        let video_name = id::resource_id();
        let audio_name = id::resource_id();
        let encoder_settings = self.encoder_settings(&destination_id, &video_name, &audio_name);

        let audio_selector = AudioSelector::builder()
            .name(&self.profile.audio_selector_name)
            .build();

        let output = self
            .client
            .create_channel()
            .name(id::resource_id())
            .tags(ROOM_NAME_TAG, id::tag_value(label))
            .channel_class(ChannelClass::SinglePipeline)
            .role_arn(&self.role_arn)
            .input_attachments(
                InputAttachment::builder()
                    .input_attachment_name(id::resource_id())
                    .input_id(input_id)
                    .input_settings(
                        InputSettings::builder()
                            .audio_selectors(audio_selector)
                            .build(),
                    )
                    .build(),
            )
            .input_specification(
                InputSpecification::builder()
                    .codec(InputCodec::Avc)
                    .resolution(InputResolution::Hd)
                    .maximum_bitrate(InputMaximumBitrate::Max20Mbps)
                    .build(),
            )
            .destinations(
                OutputDestination::builder()
                    .id(&destination_id)
                    .media_package_settings(
                        MediaPackageOutputDestinationSettings::builder()
                            .channel_id(packaging_channel_id)
                            .build(),
                    )
                    .build(),
            )
            .encoder_settings(encoder_settings)
            .send()
            .await
            .map_err(Error::sdk)?;

        output
            .channel()
            .and_then(|channel| channel.id())
            .map(ToOwned::to_owned)
            .ok_or(Error::MissingField("Channel.Id"))
    }

    async fn delete_input(&self, input_id: &str) -> Result<(), Error> {
        self.client
            .delete_input()
            .input_id(input_id)
            .send()
            .await
            .map_err(Error::sdk)?;

        Ok(())
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), Error> {
        let channel = self
            .client
            .describe_channel()
            .channel_id(channel_id)
            .send()
            .await
            .map_err(Error::sdk)?;

        let input_ids = channel
            .input_attachments()
            .iter()
            .filter_map(|attachment| attachment.input_id())
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>();

        self.client
            .delete_channel()
            .channel_id(channel_id)
            .send()
            .await
            .map_err(Error::sdk)?;

        if !input_ids.is_empty() {
            let this = self.clone();
            let resource = format!("channel/{}", channel_id);
            let channel_id = channel_id.to_owned();

            self.pending.spawn(resource, async move {
                if let Err(err) = this.delete_inputs_when_deleted(&channel_id, &input_ids).await {
                    error!(%channel_id, ?input_ids, %err, "Attached inputs were not deleted");
                }
            });
        }

        Ok(())
    }
}
