use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};

use crate::{
    app::{
        context::{AppContext, GlobalContext},
        error::{Error as AppError, ErrorExt, ErrorKind as AppErrorKind},
        room::{deprovision, provision},
    },
    db::room,
};

////////////////////////////////////////////////////////////////////////////////

/// Event trigger delivery from the data store.
#[derive(Debug, Deserialize)]
pub(crate) struct TriggerPayload {
    pub(crate) id: String,
    pub(crate) trigger: Trigger,
    pub(crate) table: Table,
    pub(crate) event: TriggerEvent,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Trigger {
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Table {
    pub(crate) schema: String,
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TriggerEvent {
    pub(crate) op: Operation,
    pub(crate) data: RowData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum Operation {
    Insert,
    Update,
    Delete,
    Manual,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RowData {
    #[serde(default)]
    pub(crate) old: Option<room::Object>,
    #[serde(default)]
    pub(crate) new: Option<room::Object>,
}

////////////////////////////////////////////////////////////////////////////////

pub(crate) async fn handle(
    Extension(ctx): Extension<Arc<AppContext>>,
    Json(payload): Json<TriggerPayload>,
) -> Result<Json<JsonValue>, AppError> {
    let TriggerPayload {
        id,
        trigger,
        table,
        event,
    } = payload;

    info!(
        event_id = %id,
        trigger = %trigger.name,
        table = %format!("{}.{}", table.schema, table.name),
        op = ?event.op,
        "Room event received"
    );

    match event.op {
        Operation::Insert => {
            let room = event
                .data
                .new
                .ok_or_else(|| anyhow::anyhow!("INSERT event carries no new row"))
                .error(AppErrorKind::InvalidPayload)?;

            if room.provisioning().is_some() {
                info!(room_id = %room.id, "Room is already provisioned");
                return Ok(Json(json!({})));
            }

            // Redeliveries carry the row as it was at insert time.
            let stored = ctx
                .store()
                .find_room(&room.id)
                .await
                .error(AppErrorKind::DbQueryFailed)?;

            match stored {
                None => info!(room_id = %room.id, "Room no longer exists"),
                Some(stored) if stored.provisioning().is_some() => {
                    info!(room_id = %room.id, "Room is already provisioned");
                }
                Some(stored) => {
                    provision(ctx.as_ref(), &stored.id, &stored.name).await?;
                }
            }
        }
        Operation::Delete => {
            let room = event
                .data
                .old
                .ok_or_else(|| anyhow::anyhow!("DELETE event carries no old row"))
                .error(AppErrorKind::InvalidPayload)?;

            deprovision(ctx.as_ref(), &room).await;
        }
        Operation::Update | Operation::Manual => {
            debug!("Nothing to do for this operation");
        }
    }

    Ok(Json(json!({})))
}
