use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////

/// Opaque room id assigned by the data store.
#[derive(Debug, Deserialize, Serialize, Display, From, Clone, Hash, PartialEq, Eq)]
#[serde(transparent)]
pub struct Id(String);

impl From<&str> for Id {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Room row as stored by the data store.
///
/// Provisioning columns are either all null or all set.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub ingest_input_id: Option<String>,
    #[serde(default)]
    pub rtmp_uri: Option<String>,
    #[serde(default)]
    pub transcode_channel_id: Option<String>,
    #[serde(default)]
    pub packaging_channel_id: Option<String>,
    #[serde(default)]
    pub origin_endpoint_id: Option<String>,
    #[serde(default)]
    pub origin_endpoint_uri: Option<String>,
    #[serde(default)]
    pub distribution_id: Option<String>,
    #[serde(default)]
    pub distribution_domain: Option<String>,
    #[serde(default, rename = "vonageSessionId")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub hls_uri: Option<String>,
}

impl Object {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ingest_input_id: None,
            rtmp_uri: None,
            transcode_channel_id: None,
            packaging_channel_id: None,
            origin_endpoint_id: None,
            origin_endpoint_uri: None,
            distribution_id: None,
            distribution_domain: None,
            session_id: None,
            hls_uri: None,
        }
    }

    /// Complete provisioning record, if the row carries one.
    pub fn provisioning(&self) -> Option<Provisioning> {
        Some(Provisioning {
            ingest_input_id: self.ingest_input_id.clone()?,
            rtmp_uri: self.rtmp_uri.clone()?,
            transcode_channel_id: self.transcode_channel_id.clone()?,
            packaging_channel_id: self.packaging_channel_id.clone()?,
            origin_endpoint_id: self.origin_endpoint_id.clone()?,
            origin_endpoint_uri: self.origin_endpoint_uri.clone()?,
            distribution_id: self.distribution_id.clone()?,
            distribution_domain: self.distribution_domain.clone()?,
            session_id: self.session_id.clone()?,
            hls_uri: self.hls_uri.clone()?,
        })
    }

    pub fn apply(&mut self, provisioning: &Provisioning) {
        let p = provisioning.clone();
        self.ingest_input_id = Some(p.ingest_input_id);
        self.rtmp_uri = Some(p.rtmp_uri);
        self.transcode_channel_id = Some(p.transcode_channel_id);
        self.packaging_channel_id = Some(p.packaging_channel_id);
        self.origin_endpoint_id = Some(p.origin_endpoint_id);
        self.origin_endpoint_uri = Some(p.origin_endpoint_uri);
        self.distribution_id = Some(p.distribution_id);
        self.distribution_domain = Some(p.distribution_domain);
        self.session_id = Some(p.session_id);
        self.hls_uri = Some(p.hls_uri);
    }
}

/// Everything one successful provisioning attempt produced, written in a single update.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Provisioning {
    pub ingest_input_id: String,
    pub rtmp_uri: String,
    pub transcode_channel_id: String,
    pub packaging_channel_id: String,
    pub origin_endpoint_id: String,
    pub origin_endpoint_uri: String,
    pub distribution_id: String,
    pub distribution_domain: String,
    #[serde(rename = "vonageSessionId")]
    pub session_id: String,
    pub hls_uri: String,
}
