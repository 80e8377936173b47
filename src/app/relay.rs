use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::context::GlobalContext;
use crate::{
    backend::{self, BroadcastTarget, Layout, RtmpTarget},
    db::{self, room},
    id,
};

////////////////////////////////////////////////////////////////////////////////

/// Callback delivered by the realtime session back-end.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WebhookEvent {
    pub(crate) session_id: String,
    #[serde(default)]
    pub(crate) project_id: Option<String>,
    #[serde(default)]
    pub(crate) timestamp: Option<i64>,
    #[serde(flatten)]
    pub(crate) kind: EventKind,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub(crate) enum EventKind {
    ConnectionCreated {
        #[serde(default)]
        connection: Option<Connection>,
    },
    ConnectionDestroyed {
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        connection: Option<Connection>,
    },
    StreamCreated {
        stream: Stream,
    },
    StreamDestroyed {
        #[serde(default)]
        reason: Option<String>,
        stream: Stream,
    },
    #[serde(other)]
    Other,
}

impl EventKind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::ConnectionCreated { .. } => "connectionCreated",
            Self::ConnectionDestroyed { .. } => "connectionDestroyed",
            Self::StreamCreated { .. } => "streamCreated",
            Self::StreamDestroyed { .. } => "streamDestroyed",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Connection {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) created_at: Option<i64>,
    #[serde(default)]
    pub(crate) data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Stream {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) video_type: Option<String>,
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, thiserror::Error)]
pub(crate) enum RelayError {
    #[error("failed to look up room: {0}")]
    Store(#[from] db::Error),
    #[error("no room uses session {0}")]
    RoomNotFound(String),
    #[error("room {0} has no ingest publish uri")]
    PublishUriMissing(room::Id),
    #[error("publish uri `{0}` has no stream name")]
    InvalidPublishUri(String),
    #[error("realtime back-end call failed: {0}")]
    Backend(#[from] backend::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Started { broadcast_id: String },
    AlreadyBroadcasting,
    Ignored,
}

#[instrument(skip(ctx, event), fields(session_id = %event.session_id, event = event.kind.name()))]
pub(crate) async fn handle<C: GlobalContext>(
    ctx: &C,
    event: &WebhookEvent,
) -> Result<Outcome, RelayError> {
    ctx.metrics().observe_webhook_event(event.kind.name());
    debug!(project_id = ?event.project_id, timestamp = ?event.timestamp, "Webhook received");

    match &event.kind {
        EventKind::ConnectionCreated { connection } => {
            if let Some(connection) = connection {
                debug!(
                    connection_id = %connection.id,
                    created_at = ?connection.created_at,
                    data = ?connection.data,
                    "Connection created"
                );
            }

            start_broadcast_once(ctx, &event.session_id).await
        }
        EventKind::ConnectionDestroyed { connection, reason } => {
            let connection_id = connection.as_ref().map(|connection| connection.id.as_str());
            debug!(?connection_id, ?reason, "Connection destroyed");
            Ok(Outcome::Ignored)
        }
        EventKind::StreamCreated { stream } => {
            debug!(
                stream_id = %stream.id,
                name = ?stream.name,
                video_type = ?stream.video_type,
                "Stream created"
            );
            Ok(Outcome::Ignored)
        }
        EventKind::StreamDestroyed { stream, reason } => {
            debug!(stream_id = %stream.id, ?reason, "Stream destroyed");
            Ok(Outcome::Ignored)
        }
        EventKind::Other => Ok(Outcome::Ignored),
    }
}

/// Relays the session into the room ingest unless a broadcast already runs.
async fn start_broadcast_once<C: GlobalContext>(
    ctx: &C,
    session_id: &str,
) -> Result<Outcome, RelayError> {
    let realtime = &ctx.backends().realtime;

    let broadcasts = realtime.list_broadcasts(session_id).await?;
    if let Some(active) = broadcasts.iter().find(|broadcast| broadcast.is_active()) {
        info!(broadcast_id = %active.id, "Broadcast already running");
        return Ok(Outcome::AlreadyBroadcasting);
    }

    let room = ctx
        .store()
        .find_room_by_session_id(session_id)
        .await?
        .ok_or_else(|| RelayError::RoomNotFound(session_id.to_owned()))?;

    let rtmp_uri = room
        .rtmp_uri
        .as_deref()
        .ok_or_else(|| RelayError::PublishUriMissing(room.id.clone()))?;

    let (server_url, stream_name) = split_publish_uri(rtmp_uri)
        .ok_or_else(|| RelayError::InvalidPublishUri(rtmp_uri.to_owned()))?;

    let target = BroadcastTarget {
        layout: Layout::BestFit,
        rtmp: vec![RtmpTarget {
            id: id::resource_id(),
            server_url: server_url.to_owned(),
            stream_name: stream_name.to_owned(),
        }],
    };

    let broadcast_id = match realtime.start_broadcast(session_id, &target).await {
        Ok(broadcast_id) => broadcast_id,
        Err(backend::Error::BroadcastConflict(_)) => {
            info!(room_id = %room.id, "Broadcast was started concurrently");
            return Ok(Outcome::AlreadyBroadcasting);
        }
        Err(err) => return Err(err.into()),
    };
    ctx.metrics().broadcasts_started.inc();
    info!(%broadcast_id, room_id = %room.id, "Started broadcast");

    Ok(Outcome::Started { broadcast_id })
}

/// Splits `rtmp://host/app/stream` into `rtmp://host/app/` and `stream`.
fn split_publish_uri(uri: &str) -> Option<(&str, &str)> {
    let idx = uri.rfind('/')?;
    let (server_url, stream_name) = (&uri[..=idx], &uri[idx + 1..]);

    if stream_name.is_empty() || !server_url.contains("://") {
        return None;
    }

    Some((server_url, stream_name))
}
