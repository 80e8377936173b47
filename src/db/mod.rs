use async_trait::async_trait;
use reqwest::StatusCode;

pub mod graphql;
pub mod room;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("data store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected data store response status: {0}")]
    UnexpectedResponse(StatusCode),
    #[error("data store returned errors: {0}")]
    Graphql(String),
    #[error("data store response has no data")]
    MissingData,
    #[error("room {0} not found")]
    RoomNotFound(room::Id),
    #[error("{0} rooms match session {1}")]
    AmbiguousSession(usize, String),
}

/// Query/mutation contract over Room records.
#[async_trait]
pub trait RoomStore: Sync + Send {
    /// Sets every provisioning column in one mutation.
    async fn update_room(
        &self,
        id: &room::Id,
        provisioning: &room::Provisioning,
    ) -> Result<(), Error>;

    async fn find_room(&self, id: &room::Id) -> Result<Option<room::Object>, Error>;

    async fn find_room_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<room::Object>, Error>;
}
