use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand::Rng;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use uuid::Uuid;

use super::{
    Broadcast, BroadcastTarget, Error, Layout, MediaMode, RealtimeSessionClient, Role, RtmpTarget,
};
use crate::config::OpentokConfig;

type HmacSha1 = Hmac<Sha1>;

const DEFAULT_API_URL: &str = "https://api.opentok.com";
const AUTH_HEADER: &str = "X-OPENTOK-AUTH";
const TOKEN_SENTINEL: &str = "T1==";

#[derive(Clone)]
pub struct OpentokClient {
    http: Client,
    api_url: Option<Url>,
    api_key: String,
    api_secret: String,
    token_ttl: Duration,
    jwt_ttl: Duration,
}

impl OpentokClient {
    pub fn new(config: &OpentokConfig) -> Self {
        Self {
            http: Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            token_ttl: config.token_ttl,
            jwt_ttl: config.jwt_ttl,
        }
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        let base = match &self.api_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_API_URL).map_err(Error::build)?,
        };

        base.join(path).map_err(Error::build)
    }

    fn broadcast_url(&self) -> Result<Url, Error> {
        self.url(&format!("/v2/project/{}/broadcast", self.api_key))
    }

    /// Short-lived project JWT for the REST API.
    fn auth_token(&self) -> Result<String, Error> {
        let now = Utc::now().timestamp();
        let claims = ProjectClaims {
            iss: &self.api_key,
            ist: "project",
            iat: now,
            exp: now + self.jwt_ttl.as_secs() as i64,
            jti: Uuid::new_v4(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )?;

        Ok(token)
    }
}

#[derive(Serialize)]
struct ProjectClaims<'a> {
    iss: &'a str,
    ist: &'static str,
    iat: i64,
    exp: i64,
    jti: Uuid,
}

#[derive(Deserialize)]
struct CreatedSession {
    session_id: String,
}

#[derive(Deserialize)]
struct BroadcastList {
    items: Vec<Broadcast>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartBroadcastRequest<'a> {
    session_id: &'a str,
    layout: Layout,
    outputs: BroadcastOutputs<'a>,
}

#[derive(Serialize)]
struct BroadcastOutputs<'a> {
    rtmp: &'a [RtmpTarget],
}

#[derive(Deserialize)]
struct StartedBroadcast {
    id: String,
}

#[async_trait]
impl RealtimeSessionClient for OpentokClient {
    async fn create_session(&self, mode: MediaMode) -> Result<String, Error> {
        let p2p_preference = match mode {
            MediaMode::Routed => "disabled",
            MediaMode::Relayed => "enabled",
        };

        let r = self
            .http
            .post(self.url("/session/create")?)
            .header(AUTH_HEADER, self.auth_token()?)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("p2p.preference", p2p_preference)])
            .send()
            .await?;

        match r.status() {
            StatusCode::OK => {
                let sessions = r.json::<Vec<CreatedSession>>().await?;
                sessions
                    .into_iter()
                    .next()
                    .map(|session| session.session_id)
                    .ok_or(Error::MissingField("session_id"))
            }
            otherwise => Err(Error::UnexpectedResponse(otherwise)),
        }
    }

    fn generate_token(&self, session_id: &str, role: Role, data: &str) -> Result<String, Error> {
        let now = Utc::now().timestamp();
        let nonce = rand::thread_rng().gen::<u32>();

        let token_data = format!(
            "session_id={}&create_time={}&expire_time={}&role={}&nonce={}&connection_data={}",
            session_id,
            now,
            now + self.token_ttl.as_secs() as i64,
            role,
            nonce,
            urlencoding::encode(data),
        );

        let mut mac = HmacSha1::new_from_slice(self.api_secret.as_bytes())
            .map_err(|err| Error::Build(err.to_string().into()))?;
        mac.update(token_data.as_bytes());
        let signature = mac
            .finalize()
            .into_bytes()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<String>();

        let payload = format!(
            "partner_id={}&sig={}:{}",
            self.api_key, signature, token_data
        );

        Ok(format!("{}{}", TOKEN_SENTINEL, base64::encode(payload)))
    }

    async fn start_broadcast(
        &self,
        session_id: &str,
        target: &BroadcastTarget,
    ) -> Result<String, Error> {
        let body = StartBroadcastRequest {
            session_id,
            layout: target.layout,
            outputs: BroadcastOutputs {
                rtmp: &target.rtmp,
            },
        };

        let r = self
            .http
            .post(self.broadcast_url()?)
            .header(AUTH_HEADER, self.auth_token()?)
            .json(&body)
            .send()
            .await?;

        match r.status() {
            StatusCode::OK => Ok(r.json::<StartedBroadcast>().await?.id),
            StatusCode::CONFLICT => Err(Error::BroadcastConflict(session_id.to_owned())),
            otherwise => Err(Error::UnexpectedResponse(otherwise)),
        }
    }

    async fn list_broadcasts(&self, session_id: &str) -> Result<Vec<Broadcast>, Error> {
        let r = self
            .http
            .get(self.broadcast_url()?)
            .query(&[("sessionId", session_id)])
            .header(AUTH_HEADER, self.auth_token()?)
            .send()
            .await?;

        match r.status() {
            StatusCode::OK => Ok(r.json::<BroadcastList>().await?.items),
            otherwise => Err(Error::UnexpectedResponse(otherwise)),
        }
    }
}
