use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use super::{room, Error, RoomStore};
use crate::config::GraphqlConfig;

const ADMIN_SECRET_HEADER: &str = "x-hasura-admin-secret";

const COMPLETE_ROOM: &str = r#"
mutation CompleteRoom($id: uuid!, $set: Room_set_input!) {
    update_Room(where: { id: { _eq: $id } }, _set: $set) {
        affected_rows
    }
}
"#;

const GET_ROOM: &str = r#"
query GetRoom($id: uuid!) {
    Room(where: { id: { _eq: $id } }) {
        id name ingestInputId rtmpUri transcodeChannelId packagingChannelId
        originEndpointId originEndpointUri distributionId distributionDomain
        vonageSessionId hlsUri
    }
}
"#;

const GET_ROOM_BY_SESSION_ID: &str = r#"
query GetRoomBySessionId($sessionId: String!) {
    Room(where: { vonageSessionId: { _eq: $sessionId } }) {
        id name ingestInputId rtmpUri transcodeChannelId packagingChannelId
        originEndpointId originEndpointUri distributionId distributionDomain
        vonageSessionId hlsUri
    }
}
"#;

#[derive(Clone)]
pub struct GraphqlClient {
    http: Client,
    url: Url,
    admin_secret: String,
}

impl GraphqlClient {
    pub fn new(config: &GraphqlConfig) -> Self {
        Self {
            http: Client::new(),
            url: config.url.clone(),
            admin_secret: config.admin_secret.clone(),
        }
    }

    async fn execute<V, R>(&self, query: &str, variables: V) -> Result<R, Error>
    where
        V: Serialize,
        R: DeserializeOwned,
    {
        let r = self
            .http
            .post(self.url.clone())
            .header(ADMIN_SECRET_HEADER, &self.admin_secret)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let response = match r.status() {
            StatusCode::OK => r.json::<GraphqlResponse<R>>().await?,
            otherwise => return Err(Error::UnexpectedResponse(otherwise)),
        };

        if !response.errors.is_empty() {
            let messages = response
                .errors
                .into_iter()
                .map(|error| error.message)
                .collect::<Vec<_>>()
                .join("; ");

            return Err(Error::Graphql(messages));
        }

        response.data.ok_or(Error::MissingData)
    }
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
struct UpdateRoomData {
    #[serde(rename = "update_Room")]
    update_room: AffectedRows,
}

#[derive(Deserialize)]
struct AffectedRows {
    affected_rows: usize,
}

#[derive(Deserialize)]
struct RoomsData {
    #[serde(rename = "Room")]
    rooms: Vec<room::Object>,
}

#[async_trait]
impl RoomStore for GraphqlClient {
    async fn update_room(
        &self,
        id: &room::Id,
        provisioning: &room::Provisioning,
    ) -> Result<(), Error> {
        let data: UpdateRoomData = self
            .execute(COMPLETE_ROOM, json!({ "id": id, "set": provisioning }))
            .await?;

        match data.update_room.affected_rows {
            0 => Err(Error::RoomNotFound(id.to_owned())),
            _ => Ok(()),
        }
    }

    async fn find_room(&self, id: &room::Id) -> Result<Option<room::Object>, Error> {
        let data: RoomsData = self.execute(GET_ROOM, json!({ "id": id })).await?;
        Ok(data.rooms.into_iter().next())
    }

    async fn find_room_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<room::Object>, Error> {
        let data: RoomsData = self
            .execute(GET_ROOM_BY_SESSION_ID, json!({ "sessionId": session_id }))
            .await?;

        match data.rooms.len() {
            0 | 1 => Ok(data.rooms.into_iter().next()),
            n => Err(Error::AmbiguousSession(n, session_id.to_owned())),
        }
    }
}
