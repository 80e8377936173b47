use tracing::{info, instrument};

use super::context::GlobalContext;
use crate::{
    backend::{self, Role},
    db::{self, room},
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum TokenError {
    #[error("failed to look up room: {0}")]
    Store(#[from] db::Error),
    #[error("room {0} not found")]
    RoomNotFound(room::Id),
    #[error("room {0} has no realtime session")]
    SessionMissing(room::Id),
    #[error("failed to generate token: {0}")]
    Backend(#[from] backend::Error),
}

/// Publisher token for the room's realtime session, with no connection data.
#[instrument(skip(ctx, room_id), fields(room_id = %room_id))]
pub(crate) async fn issue_token<C: GlobalContext>(
    ctx: &C,
    room_id: &room::Id,
) -> Result<String, TokenError> {
    let room = ctx
        .store()
        .find_room(room_id)
        .await?
        .ok_or_else(|| TokenError::RoomNotFound(room_id.to_owned()))?;

    let session_id = room
        .session_id
        .as_deref()
        .ok_or_else(|| TokenError::SessionMissing(room.id.clone()))?;

    let token = ctx
        .backends()
        .realtime
        .generate_token(session_id, Role::Publisher, "")?;

    info!(%session_id, "Issued room token");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::prelude::*;

    #[tokio::test]
    async fn issues_publisher_token() {
        let ctx = TestContext::new();
        let mut room = room::Object::new(room::Id::from("r1"), "Demo Room");
        room.session_id = Some("s1".to_owned());
        ctx.store.insert(room);

        let token = issue_token(&ctx, &room::Id::from("r1"))
            .await
            .expect("failed to issue token");

        assert_eq!(token, "T1==token:s1:publisher:");
    }

    #[tokio::test]
    async fn missing_room() {
        let ctx = TestContext::new();

        let err = issue_token(&ctx, &room::Id::from("r1"))
            .await
            .expect_err("token should not be issued");

        assert!(matches!(err, TokenError::RoomNotFound(_)));
    }

    #[tokio::test]
    async fn unprovisioned_room_has_no_session() {
        let ctx = TestContext::new();
        ctx.store
            .insert(room::Object::new(room::Id::from("r1"), "Demo Room"));

        let err = issue_token(&ctx, &room::Id::from("r1"))
            .await
            .expect_err("token should not be issued");

        assert!(matches!(err, TokenError::SessionMissing(_)));
        assert!(ctx.journal.calls().is_empty());
    }
}
