use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde_json::{json, Value as JsonValue};

use crate::app::{
    context::AppContext,
    error::Error as AppError,
    relay::{self, WebhookEvent},
};

pub(crate) async fn handle(
    Extension(ctx): Extension<Arc<AppContext>>,
    Json(event): Json<WebhookEvent>,
) -> Result<Json<JsonValue>, AppError> {
    relay::handle(ctx.as_ref(), &event).await?;
    Ok(Json(json!({})))
}
