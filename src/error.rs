//! Error types for the watcher.
//!
//! One closed enum covers every failure mode of a polling cycle, so the
//! loop can branch on kind instead of on message text.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A required setting is missing or empty. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The status request failed at the transport level.
    #[error("request to {endpoint} with from_date={from_date} failed: {source}")]
    Fetch {
        endpoint: &'static str,
        from_date: i64,
        #[source]
        source: reqwest::Error,
    },

    /// The status request came back with a non-success HTTP status.
    #[error("request to {endpoint} with from_date={from_date} returned HTTP {status}")]
    FetchStatus {
        endpoint: &'static str,
        from_date: i64,
        status: reqwest::StatusCode,
    },

    /// The response payload is not a JSON object.
    #[error("malformed response: payload is not a JSON object")]
    NotAnObject,

    /// The response payload lacks an expected key.
    #[error("malformed response: missing key `{0}`")]
    MissingKey(&'static str),

    /// A response value has the wrong type.
    #[error("malformed response: `{key}` is not {expected}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
    },

    /// A homework record lacks a field the formatter needs.
    #[error("homework record is missing field `{0}`")]
    MissingField(&'static str),

    /// A homework record carries a status with no verdict mapping.
    #[error("unknown homework status `{0}`")]
    UnknownStatus(String),

    /// Delivery to the chat failed.
    #[error("failed to deliver message to chat {chat_id}: {reason}")]
    Send { chat_id: String, reason: String },
}

impl Error {
    /// Whether this failure itself warrants a best-effort chat report.
    ///
    /// Validation and formatting failures do; fetch and send failures
    /// are logged only.
    pub fn warrants_notification(&self) -> bool {
        matches!(
            self,
            Error::NotAnObject
                | Error::MissingKey(_)
                | Error::WrongType { .. }
                | Error::MissingField(_)
                | Error::UnknownStatus(_)
        )
    }
}
