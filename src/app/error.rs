use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use http::{header, StatusCode};
use svc_error::{extension::sentry, Error as SvcError};
use tracing::warn;

use super::{relay::RelayError, room::ProvisionError, token::TokenError};

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    BroadcastFailed,
    DbQueryFailed,
    InvalidPayload,
    PersistenceFailed,
    ProvisioningFailed,
    PublishUriMissing,
    RoomNotFound,
    SessionMissing,
    TokenGenerationFailed,
}

impl ErrorKind {
    pub(crate) fn is_notify_sentry(self) -> bool {
        let (_status, _kind, _title, is_notify_sentry) = self.into();
        is_notify_sentry
    }

    pub(crate) fn kind(self) -> &'static str {
        let (_status, kind, _title, _is_notify_sentry) = self.into();
        kind
    }
}

// (status, kind, title, is_notify_sentry)
impl From<ErrorKind> for (StatusCode, &'static str, &'static str, bool) {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::BroadcastFailed => (
                StatusCode::BAD_GATEWAY,
                "broadcast_failed",
                "Broadcast failed",
                true,
            ),
            ErrorKind::DbQueryFailed => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "database_query_failed",
                "Database query failed",
                true,
            ),
            ErrorKind::InvalidPayload => (
                StatusCode::BAD_REQUEST,
                "invalid_payload",
                "Invalid payload",
                false,
            ),
            ErrorKind::PersistenceFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "persistence_failed",
                "Provisioned resources were not recorded",
                true,
            ),
            ErrorKind::ProvisioningFailed => (
                StatusCode::BAD_GATEWAY,
                "provisioning_failed",
                "Provisioning failed",
                true,
            ),
            ErrorKind::PublishUriMissing => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "publish_uri_missing",
                "Room has no ingest publish URI",
                true,
            ),
            ErrorKind::RoomNotFound => (
                StatusCode::NOT_FOUND,
                "room_not_found",
                "Room not found",
                false,
            ),
            ErrorKind::SessionMissing => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "session_missing",
                "Room has no realtime session",
                false,
            ),
            ErrorKind::TokenGenerationFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_generation_failed",
                "Token generation failed",
                true,
            ),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (_status, _kind, title, _is_notify_sentry) = (*self).into();
        write!(f, "{}", title)
    }
}

////////////////////////////////////////////////////////////////////////////////

pub(crate) struct Error {
    kind: ErrorKind,
    source: anyhow::Error,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, source: impl Into<anyhow::Error>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub(crate) fn status(&self) -> StatusCode {
        let (status, _kind, _title, _is_notify_sentry) = self.kind.into();
        status
    }

    pub(crate) fn is_notify_sentry(&self) -> bool {
        self.kind.is_notify_sentry()
    }

    pub(crate) fn to_svc_error(&self) -> SvcError {
        let (status, kind, title, _is_notify_sentry) = self.kind.into();

        SvcError::builder()
            .status(status)
            .kind(kind, title)
            .detail(&format!("{:#}", self.source))
            .build()
    }

    pub(crate) fn notify_sentry(&self) {
        if !self.is_notify_sentry() {
            return;
        }

        sentry::send(self.to_sentry_error()).unwrap_or_else(|err| {
            warn!(%err, "Error sending error to Sentry");
        });
    }

    /// Sentry event carrying the kind title and the whole source chain.
    fn to_sentry_error(&self) -> Arc<anyhow::Error> {
        Arc::new(anyhow::anyhow!("{}", self))
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.kind, self.source)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.notify_sentry();

        let err = self.to_svc_error();
        let body = serde_json::to_string(&err)
            .unwrap_or_else(|_| "Failed to serialize error".to_owned());

        (
            self.status(),
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}

impl From<ProvisionError> for Error {
    fn from(source: ProvisionError) -> Self {
        let kind = match source {
            ProvisionError::Step { .. } => ErrorKind::ProvisioningFailed,
            ProvisionError::Persistence { .. } => ErrorKind::PersistenceFailed,
        };

        Self::new(kind, source)
    }
}

impl From<RelayError> for Error {
    fn from(source: RelayError) -> Self {
        let kind = match source {
            RelayError::Store(_) => ErrorKind::DbQueryFailed,
            RelayError::RoomNotFound(_) => ErrorKind::RoomNotFound,
            RelayError::PublishUriMissing(_) | RelayError::InvalidPublishUri(_) => {
                ErrorKind::PublishUriMissing
            }
            RelayError::Backend(_) => ErrorKind::BroadcastFailed,
        };

        Self::new(kind, source)
    }
}

impl From<TokenError> for Error {
    fn from(source: TokenError) -> Self {
        let kind = match source {
            TokenError::Store(_) => ErrorKind::DbQueryFailed,
            TokenError::RoomNotFound(_) => ErrorKind::RoomNotFound,
            TokenError::SessionMissing(_) => ErrorKind::SessionMissing,
            TokenError::Backend(_) => ErrorKind::TokenGenerationFailed,
        };

        Self::new(kind, source)
    }
}

////////////////////////////////////////////////////////////////////////////////

pub(crate) trait ErrorExt<T> {
    fn error(self, kind: ErrorKind) -> Result<T, Error>;
}

impl<T, E: Into<anyhow::Error>> ErrorExt<T> for Result<T, E> {
    fn error(self, kind: ErrorKind) -> Result<T, Error> {
        self.map_err(|source| Error::new(kind, source))
    }
}
