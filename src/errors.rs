//! Error taxonomy for the telemetry hub
//!
//! Everything here is recoverable at the connection level: decode and
//! store failures are reported back to the originating connection only,
//! transport failures are treated as a close. Nothing is fatal to the
//! hub as a whole.
use thiserror::Error;

/// Failure to decode an inbound envelope
///
/// The connection stays open; the sender gets an `error` reply.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("missing or non-string 'type' field")]
    MissingType,

    #[error("unknown message type '{0}'")]
    UnknownKind(String),

    #[error("invalid '{kind}' payload: {reason}")]
    InvalidPayload { kind: String, reason: String },
}

/// Failure inside the durable store gateway
///
/// Surfaced to the sender as an `error` reply; the event is never
/// broadcast. Retry policy belongs to the sender, not the router.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("unknown entity: {0}")]
    NotFound(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(e.to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}
