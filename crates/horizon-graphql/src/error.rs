//! Error types for the GraphQL client.

use serde_json::Value;

use crate::response::GraphQLError;

/// Boxed error returned by pluggable transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse classification of a [`ClientError`].
///
/// Useful when callers only need to branch on the failure category and do
/// not care about the attached payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The unary transport call itself failed.
    Network,
    /// The response body could not be parsed.
    InvalidResponse,
    /// The server answered with errors and no data.
    Request,
    /// The server answered with partial data and errors.
    Field,
    /// A channel with the same id is already open.
    DuplicateChannel,
    /// Invalid client configuration (URL, headers, transport setup).
    Config,
    /// JSON encoding or decoding failed outside of response parsing.
    Json,
    /// The persistent socket could not be used.
    Socket,
}

/// Errors produced by the GraphQL client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Network call failed before a response body was read.
    #[error("GraphQL network request failed: {0}")]
    Network(String),

    /// The response body was not a valid GraphQL response.
    #[error("GraphQL server returned an invalid response (HTTP {status}): {reason}")]
    InvalidResponse {
        /// HTTP status code of the response.
        status: u16,
        /// Why the body could not be parsed.
        reason: String,
        /// The raw response body.
        body: String,
    },

    /// The server reported errors and returned no data.
    #[error("GraphQL request error: {0}")]
    Request(GraphQLError),

    /// The server returned data together with errors.
    #[error("GraphQL field error: {error}")]
    Field {
        /// The first reported error.
        error: GraphQLError,
        /// The partial data returned alongside the errors.
        data: Value,
    },

    /// A channel with this id is already open on the connection.
    #[error("subscription channel `{0}` is already open")]
    DuplicateChannel(String),

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    Socket(String),

    /// Subscriptions need a tokio runtime to drive the socket.
    #[error("no tokio runtime is available to drive the subscription socket")]
    NoRuntime,
}

impl ClientError {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            Self::Request(_) => ErrorKind::Request,
            Self::Field { .. } => ErrorKind::Field,
            Self::DuplicateChannel(_) => ErrorKind::DuplicateChannel,
            Self::InvalidUrl(_) | Self::InvalidHeader(_) | Self::Config(_) => ErrorKind::Config,
            Self::Json(_) => ErrorKind::Json,
            Self::Socket(_) | Self::NoRuntime => ErrorKind::Socket,
        }
    }

    /// The server-reported error entry, for request and field errors.
    pub fn graphql_error(&self) -> Option<&GraphQLError> {
        match self {
            Self::Request(error) | Self::Field { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The raw response body, for invalid-response errors.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Self::InvalidResponse { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for ClientError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for ClientError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// A specialized Result type for GraphQL client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
