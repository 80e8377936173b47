use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};

use crate::{
    app::{context::AppContext, error::Error as AppError, token::issue_token},
    db::room,
};

/// Action call envelope; only `input` is read.
#[derive(Debug, Deserialize)]
pub(crate) struct ActionPayload<T> {
    pub(crate) input: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RoomTokenInput {
    pub(crate) room_id: room::Id,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoomTokenResponse {
    pub(crate) token: String,
}

pub(crate) async fn handle(
    Extension(ctx): Extension<Arc<AppContext>>,
    Json(payload): Json<ActionPayload<RoomTokenInput>>,
) -> Result<Json<RoomTokenResponse>, AppError> {
    let token = issue_token(ctx.as_ref(), &payload.input.room_id).await?;
    Ok(Json(RoomTokenResponse { token }))
}
