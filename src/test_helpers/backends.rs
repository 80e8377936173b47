use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::backend::{
    Broadcast, BroadcastTarget, Distribution, DistributionClient, Error, IngestClient, Input,
    MediaMode, OriginEndpoint, PackagingClient, RealtimeSessionClient, Role,
};

pub(crate) const RTMP_URI: &str = "rtmp://203.0.113.10:1935/live/stream123";
pub(crate) const ORIGIN_ENDPOINT_URI: &str =
    "https://abc123.mediapackage.us-east-1.amazonaws.com/out/v1/5f2a/index.m3u8";
pub(crate) const DISTRIBUTION_DOMAIN: &str = "d111111abcdef8.cloudfront.net";

/// Ordered log of every back-end and store call, shared by all fakes.
///
/// Entries look like `ingest.create_input` or `ingest.delete_input input-1`.
#[derive(Default)]
pub(crate) struct Journal {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl Journal {
    pub(crate) fn record(&self, call: impl Into<String>) -> Result<(), Error> {
        let call = call.into();
        let operation = call.split(' ').next().unwrap_or_default().to_owned();
        self.calls.lock().expect("journal lock").push(call);

        if self.failing.lock().expect("journal lock").contains(&operation) {
            Err(Error::UnexpectedResponse(StatusCode::INTERNAL_SERVER_ERROR))
        } else {
            Ok(())
        }
    }

    /// Makes every later call of `operation` fail.
    pub(crate) fn fail(&self, operation: &str) {
        self.failing
            .lock()
            .expect("journal lock")
            .insert(operation.to_owned());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("journal lock").clone()
    }

    pub(crate) fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.contains(".delete_"))
            .collect()
    }
}

////////////////////////////////////////////////////////////////////////////////

pub(crate) struct FakeIngest {
    journal: Arc<Journal>,
    security_groups: Mutex<Vec<String>>,
}

impl FakeIngest {
    pub(crate) fn new(journal: Arc<Journal>) -> Self {
        Self {
            journal,
            security_groups: Mutex::new(vec![]),
        }
    }

    pub(crate) fn security_groups(&self) -> Vec<String> {
        self.security_groups.lock().expect("lock").clone()
    }
}

#[async_trait]
impl IngestClient for FakeIngest {
    async fn create_or_get_security_group(&self) -> Result<String, Error> {
        self.journal.record("ingest.create_or_get_security_group")?;

        let mut groups = self.security_groups.lock().expect("lock");
        if groups.is_empty() {
            groups.push("sg-1".to_owned());
        }

        Ok(groups[0].clone())
    }

    async fn create_input(&self, _label: &str, security_group_id: &str) -> Result<Input, Error> {
        self.journal
            .record(format!("ingest.create_input {}", security_group_id))?;

        Ok(Input {
            id: "input-1".to_owned(),
            rtmp_uri: RTMP_URI.to_owned(),
        })
    }

    async fn create_channel(
        &self,
        _label: &str,
        input_id: &str,
        packaging_channel_id: &str,
    ) -> Result<String, Error> {
        self.journal.record(format!(
            "ingest.create_channel {} {}",
            input_id, packaging_channel_id
        ))?;

        Ok("channel-1".to_owned())
    }

    async fn delete_input(&self, input_id: &str) -> Result<(), Error> {
        self.journal
            .record(format!("ingest.delete_input {}", input_id))
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), Error> {
        self.journal
            .record(format!("ingest.delete_channel {}", channel_id))
    }
}

////////////////////////////////////////////////////////////////////////////////

pub(crate) struct FakePackaging {
    journal: Arc<Journal>,
}

impl FakePackaging {
    pub(crate) fn new(journal: Arc<Journal>) -> Self {
        Self { journal }
    }
}

#[async_trait]
impl PackagingClient for FakePackaging {
    async fn create_channel(&self, _label: &str) -> Result<String, Error> {
        self.journal.record("packaging.create_channel")?;
        Ok("package-1".to_owned())
    }

    async fn create_origin_endpoint(
        &self,
        _label: &str,
        channel_id: &str,
    ) -> Result<OriginEndpoint, Error> {
        self.journal
            .record(format!("packaging.create_origin_endpoint {}", channel_id))?;

        Ok(OriginEndpoint {
            id: "endpoint-1".to_owned(),
            uri: ORIGIN_ENDPOINT_URI.to_owned(),
        })
    }

    async fn delete_origin_endpoint(&self, endpoint_id: &str) -> Result<(), Error> {
        self.journal
            .record(format!("packaging.delete_origin_endpoint {}", endpoint_id))
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), Error> {
        self.journal
            .record(format!("packaging.delete_channel {}", channel_id))
    }
}

////////////////////////////////////////////////////////////////////////////////

pub(crate) struct FakeDistribution {
    journal: Arc<Journal>,
}

impl FakeDistribution {
    pub(crate) fn new(journal: Arc<Journal>) -> Self {
        Self { journal }
    }
}

#[async_trait]
impl DistributionClient for FakeDistribution {
    async fn create_distribution(
        &self,
        _label: &str,
        origin_host: &str,
    ) -> Result<Distribution, Error> {
        self.journal
            .record(format!("distribution.create_distribution {}", origin_host))?;

        Ok(Distribution {
            id: "dist-1".to_owned(),
            domain: DISTRIBUTION_DOMAIN.to_owned(),
        })
    }

    async fn delete_distribution(&self, distribution_id: &str) -> Result<(), Error> {
        self.journal
            .record(format!("distribution.delete_distribution {}", distribution_id))
    }
}

////////////////////////////////////////////////////////////////////////////////

pub(crate) struct FakeRealtime {
    journal: Arc<Journal>,
    broadcasts: Mutex<Vec<Broadcast>>,
    started: Mutex<Vec<(String, BroadcastTarget)>>,
    conflicting: Mutex<bool>,
}

impl FakeRealtime {
    pub(crate) fn new(journal: Arc<Journal>) -> Self {
        Self {
            journal,
            broadcasts: Mutex::new(vec![]),
            started: Mutex::new(vec![]),
            conflicting: Mutex::new(false),
        }
    }

    /// Broadcast starts fail as if another request started one first.
    pub(crate) fn reject_starts_with_conflict(&self) {
        *self.conflicting.lock().expect("lock") = true;
    }

    pub(crate) fn add_broadcast(&self, broadcast: Broadcast) {
        self.broadcasts.lock().expect("lock").push(broadcast);
    }

    pub(crate) fn started(&self) -> Vec<(String, BroadcastTarget)> {
        self.started.lock().expect("lock").clone()
    }
}

#[async_trait]
impl RealtimeSessionClient for FakeRealtime {
    async fn create_session(&self, mode: MediaMode) -> Result<String, Error> {
        self.journal
            .record(format!("realtime.create_session {:?}", mode))?;

        Ok("session-1".to_owned())
    }

    fn generate_token(&self, session_id: &str, role: Role, data: &str) -> Result<String, Error> {
        self.journal
            .record(format!("realtime.generate_token {}", session_id))?;

        Ok(format!("T1==token:{}:{}:{}", session_id, role, data))
    }

    async fn start_broadcast(
        &self,
        session_id: &str,
        target: &BroadcastTarget,
    ) -> Result<String, Error> {
        self.journal
            .record(format!("realtime.start_broadcast {}", session_id))?;

        if *self.conflicting.lock().expect("lock") {
            return Err(Error::BroadcastConflict(session_id.to_owned()));
        }

        self.started
            .lock()
            .expect("lock")
            .push((session_id.to_owned(), target.clone()));

        Ok("broadcast-1".to_owned())
    }

    async fn list_broadcasts(&self, session_id: &str) -> Result<Vec<Broadcast>, Error> {
        self.journal
            .record(format!("realtime.list_broadcasts {}", session_id))?;

        Ok(self
            .broadcasts
            .lock()
            .expect("lock")
            .iter()
            .filter(|broadcast| broadcast.session_id == session_id)
            .cloned()
            .collect())
    }
}
