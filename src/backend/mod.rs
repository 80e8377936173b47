use async_trait::async_trait;
use derive_more::Display;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub mod cloudfront;
pub mod medialive;
pub mod mediapackage;
pub mod opentok;
pub mod pending;
pub mod profile;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("sdk call failed: {0}")]
    Sdk(#[source] BoxError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response status: {0}")]
    UnexpectedResponse(StatusCode),
    #[error("response is missing `{0}`")]
    MissingField(&'static str),
    #[error("failed to build request: {0}")]
    Build(#[source] BoxError),
    #[error("failed to sign request: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("distribution {0} was not deployed in time")]
    DeployTimedOut(String),
    #[error("channel {0} was not deleted in time")]
    DeleteTimedOut(String),
    #[error("session {0} is already broadcasting")]
    BroadcastConflict(String),
}

impl Error {
    pub fn sdk<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Sdk(Box::new(err))
    }

    pub fn build<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Build(Box::new(err))
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub id: String,
    /// RTMP publish URI, e.g. `rtmp://1.2.3.4:1935/app/stream`.
    pub rtmp_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginEndpoint {
    pub id: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub id: String,
    pub domain: String,
}

/// Stream ingest and transcoding back-end.
#[async_trait]
pub trait IngestClient: Sync + Send {
    /// Returns the deployment-wide security group, creating it only when none exists.
    async fn create_or_get_security_group(&self) -> Result<String, Error>;

    async fn create_input(&self, label: &str, security_group_id: &str) -> Result<Input, Error>;

    async fn create_channel(
        &self,
        label: &str,
        input_id: &str,
        packaging_channel_id: &str,
    ) -> Result<String, Error>;

    async fn delete_input(&self, input_id: &str) -> Result<(), Error>;

    /// Deletes the channel. Inputs attached to it are deleted in the background
    /// once the channel is gone.
    async fn delete_channel(&self, channel_id: &str) -> Result<(), Error>;
}

/// Segmenting and packaging back-end.
#[async_trait]
pub trait PackagingClient: Sync + Send {
    async fn create_channel(&self, label: &str) -> Result<String, Error>;

    async fn create_origin_endpoint(
        &self,
        label: &str,
        channel_id: &str,
    ) -> Result<OriginEndpoint, Error>;

    async fn delete_origin_endpoint(&self, endpoint_id: &str) -> Result<(), Error>;

    /// Deletes the channel after every origin endpoint it owns.
    async fn delete_channel(&self, channel_id: &str) -> Result<(), Error>;
}

/// CDN back-end.
#[async_trait]
pub trait DistributionClient: Sync + Send {
    async fn create_distribution(
        &self,
        label: &str,
        origin_host: &str,
    ) -> Result<Distribution, Error>;

    /// Disables the distribution. It is deleted in the background once the change
    /// is deployed.
    async fn delete_distribution(&self, distribution_id: &str) -> Result<(), Error>;
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaMode {
    /// Media goes through the media router, required for broadcasts.
    Routed,
    Relayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Role {
    #[display(fmt = "subscriber")]
    Subscriber,
    #[display(fmt = "publisher")]
    Publisher,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RtmpTarget {
    pub id: String,
    #[serde(rename = "serverUrl")]
    pub server_url: String,
    #[serde(rename = "streamName")]
    pub stream_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Layout {
    #[serde(rename = "bestFit")]
    BestFit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastTarget {
    pub layout: Layout,
    pub rtmp: Vec<RtmpTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastStatus {
    Started,
    Stopped,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broadcast {
    pub id: String,
    pub session_id: String,
    pub status: BroadcastStatus,
}

impl Broadcast {
    pub fn is_active(&self) -> bool {
        self.status != BroadcastStatus::Stopped
    }
}

/// Realtime audio/video session back-end.
#[async_trait]
pub trait RealtimeSessionClient: Sync + Send {
    async fn create_session(&self, mode: MediaMode) -> Result<String, Error>;

    /// Client access token. Computed locally, no round trip.
    fn generate_token(&self, session_id: &str, role: Role, data: &str) -> Result<String, Error>;

    async fn start_broadcast(
        &self,
        session_id: &str,
        target: &BroadcastTarget,
    ) -> Result<String, Error>;

    async fn list_broadcasts(&self, session_id: &str) -> Result<Vec<Broadcast>, Error>;
}

/// All provisioning back-ends, injected into the orchestrators.
#[derive(Clone)]
pub struct Backends {
    pub ingest: std::sync::Arc<dyn IngestClient>,
    pub packaging: std::sync::Arc<dyn PackagingClient>,
    pub distribution: std::sync::Arc<dyn DistributionClient>,
    pub realtime: std::sync::Arc<dyn RealtimeSessionClient>,
}
