//! The user-facing GraphQL endpoint.

use std::sync::Arc;
use std::time::Duration;

use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{ChannelFailurePolicy, EndpointConfig};
use crate::connection::{Connection, ConnectionConfig, HandshakeState, LogSink, Subscription};
use crate::error::{ClientError, Result};
use crate::request::GraphQLRequest;
use crate::response::GraphQLResponse;
use crate::transport::{
    HttpTransport, ReqwestTransport, SocketTransport, TransportRequest, TungsteniteTransport,
};

const TARGET: &str = "horizon_graphql::endpoint";

/// Hook invoked with a human-readable message and the error for every
/// failed `run`, before the error is returned to the caller.
pub type ErrorReporter = Arc<dyn Fn(&str, &ClientError) + Send + Sync>;

/// Builder for creating an [`Endpoint`].
pub struct EndpointBuilder {
    config: EndpointConfig,
    http_transport: Option<Arc<dyn HttpTransport>>,
    socket_transport: Option<Arc<dyn SocketTransport>>,
    error_reporter: Option<ErrorReporter>,
    logger: Option<LogSink>,
}

impl EndpointBuilder {
    /// Create a new builder for the given endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self::from_config(EndpointConfig::new(url))
    }

    /// Create a builder from a loaded configuration.
    pub fn from_config(config: EndpointConfig) -> Self {
        Self {
            config,
            http_transport: None,
            socket_transport: None,
            error_reporter: None,
            logger: None,
        }
    }

    /// Set the subscription socket URL.
    ///
    /// If not set, the HTTP URL is converted to its WebSocket equivalent
    /// (`http://` -> `ws://`, `https://` -> `wss://`).
    pub fn channel_url(mut self, url: impl Into<String>) -> Self {
        self.config.channel_url = Some(url.into());
        self
    }

    /// Add a header to every request.
    ///
    /// Configured headers override the built-in `Content-Type` and `Accept`.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Add multiple headers.
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.config.headers.extend(headers);
        self
    }

    /// Set bearer token authentication.
    ///
    /// The `Authorization` header is also part of the default
    /// `connection_init` payload.
    pub fn bearer_auth(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header("Authorization", value)
    }

    /// Replace the `connection_init` payload (defaults to the headers).
    pub fn init_payload(mut self, payload: impl Into<Value>) -> Self {
        self.config.init_payload = Some(payload.into());
        self
    }

    /// Set the timeout of the default HTTP transport.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms =
            Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Set the user agent of the default HTTP transport.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Choose what happens to a channel the server reports as failed.
    pub fn channel_failure(mut self, policy: ChannelFailurePolicy) -> Self {
        self.config.channel_failure = policy;
        self
    }

    /// Use a custom transport for unary requests.
    pub fn http_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.http_transport = Some(transport);
        self
    }

    /// Use a custom transport for the subscription socket.
    pub fn socket_transport(mut self, transport: Arc<dyn SocketTransport>) -> Self {
        self.socket_transport = Some(transport);
        self
    }

    /// Report failed requests to `reporter` before returning them.
    pub fn on_error<F>(mut self, reporter: F) -> Self
    where
        F: Fn(&str, &ClientError) + Send + Sync + 'static,
    {
        self.error_reporter = Some(Arc::new(reporter));
        self
    }

    /// Send connection diagnostics to `logger`.
    pub fn logger<F>(mut self, logger: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Build the endpoint.
    pub fn build(self) -> Result<Endpoint> {
        url::Url::parse(&self.config.url)?;
        let channel_url = self.config.resolved_channel_url();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &self.config.headers {
            headers.insert(
                HeaderName::try_from(name.as_str())?,
                HeaderValue::try_from(value.as_str())?,
            );
        }

        let http: Arc<dyn HttpTransport> = match self.http_transport {
            Some(transport) => transport,
            None => {
                let mut builder = ReqwestTransport::builder();
                if let Some(timeout) = self.config.request_timeout() {
                    builder = builder.timeout(timeout);
                }
                if let Some(ref ua) = self.config.user_agent {
                    builder = builder.user_agent(ua.clone());
                }
                Arc::new(builder.build()?)
            }
        };
        let socket: Arc<dyn SocketTransport> = match self.socket_transport {
            Some(transport) => transport,
            None => Arc::new(TungsteniteTransport::new()),
        };

        Ok(Endpoint {
            init_payload: self.config.resolved_init_payload(),
            url: self.config.url,
            channel_url,
            headers,
            channel_failure: self.config.channel_failure,
            http,
            socket,
            error_reporter: self.error_reporter,
            logger: Mutex::new(self.logger),
            connection: Mutex::new(None),
        })
    }
}

/// A GraphQL endpoint for queries, mutations and subscriptions.
///
/// Queries and mutations go out as one HTTP POST each. Subscriptions share a
/// single WebSocket, opened on the first call to [`subscribe`](Self::subscribe)
/// and kept for the lifetime of the endpoint.
///
/// # Example
///
/// ```ignore
/// use horizon_graphql::Endpoint;
///
/// let endpoint = Endpoint::builder("https://api.example.com/graphql")
///     .bearer_auth("my-token")
///     .on_error(|message, _err| eprintln!("{message}"))
///     .build()?;
///
/// let data = endpoint.run("{ viewer { login } }", None).await?;
///
/// let sub = endpoint.subscribe("subscription { postAdded { id } }", None, None)?;
/// sub.on_data(|data| println!("new post: {data}"));
/// ```
pub struct Endpoint {
    url: String,
    channel_url: String,
    headers: HeaderMap,
    init_payload: Value,
    channel_failure: ChannelFailurePolicy,
    http: Arc<dyn HttpTransport>,
    socket: Arc<dyn SocketTransport>,
    error_reporter: Option<ErrorReporter>,
    logger: Mutex<Option<LogSink>>,
    connection: Mutex<Option<Connection>>,
}

impl Endpoint {
    /// Create a builder for the given endpoint URL.
    pub fn builder(url: impl Into<String>) -> EndpointBuilder {
        EndpointBuilder::new(url)
    }

    /// Create an endpoint with default settings.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        EndpointBuilder::new(url).build()
    }

    /// The HTTP endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The subscription socket URL.
    pub fn channel_url(&self) -> &str {
        &self.channel_url
    }

    /// The headers sent with every unary request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Set or clear the diagnostics sink, including on a live connection.
    pub fn set_logger(&self, logger: Option<LogSink>) {
        if let Some(connection) = self.connection.lock().as_ref() {
            connection.set_logger(logger.clone());
        }
        *self.logger.lock() = logger;
    }

    /// Handshake state of the subscription connection, if one was opened.
    pub fn connection_state(&self) -> Option<HandshakeState> {
        self.connection.lock().as_ref().map(Connection::state)
    }

    /// The subscription connection, if one was opened.
    pub fn connection(&self) -> Option<Connection> {
        self.connection.lock().clone()
    }

    /// Run a query or mutation.
    ///
    /// Returns the `data` of the response, which may be `None`. Failures are
    /// passed to the error reporter, if any, and then returned.
    pub async fn run(
        &self,
        query: impl Into<String>,
        variables: Option<Value>,
    ) -> Result<Option<Value>> {
        let mut request = GraphQLRequest::new(query);
        if let Some(variables) = variables {
            request = request.variables(variables);
        }
        self.execute(request).await
    }

    /// Run a prepared request.
    pub async fn execute(&self, request: GraphQLRequest) -> Result<Option<Value>> {
        self.send(&request).await.map_err(|e| self.report(e))
    }

    /// Run a query and deserialize its data.
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: impl Into<String>,
        variables: Option<Value>,
    ) -> Result<T> {
        let data = self.run(query, variables).await?;
        serde_json::from_value(data.unwrap_or(Value::Null)).map_err(|e| {
            self.report(ClientError::Json(format!(
                "Failed to deserialize GraphQL data: {e}"
            )))
        })
    }

    /// Run a mutation and deserialize its data.
    pub async fn mutate<T: DeserializeOwned>(
        &self,
        mutation: impl Into<String>,
        variables: Option<Value>,
    ) -> Result<T> {
        self.query(mutation, variables).await
    }

    /// Open a subscription channel.
    ///
    /// Opens the shared connection on first use. Uses `channel_id` when
    /// given, otherwise a random id. Fails immediately with
    /// [`ClientError::DuplicateChannel`] if that id is still open; this
    /// error does not go through the error reporter.
    pub fn subscribe(
        &self,
        query: impl Into<String>,
        variables: Option<Value>,
        channel_id: Option<&str>,
    ) -> Result<Subscription> {
        let mut request = GraphQLRequest::new(query);
        if let Some(variables) = variables {
            request = request.variables(variables);
        }
        self.subscribe_request(request, channel_id)
    }

    /// Open a subscription channel for a prepared request.
    pub fn subscribe_request(
        &self,
        request: GraphQLRequest,
        channel_id: Option<&str>,
    ) -> Result<Subscription> {
        let connection = self.ensure_connection()?;
        connection.subscribe(request, channel_id.map(str::to_owned))
    }

    async fn send(&self, request: &GraphQLRequest) -> Result<Option<Value>> {
        let body = serde_json::to_string(request)?;
        tracing::debug!(target: TARGET, url = %self.url, "sending GraphQL request");

        let response = self
            .http
            .post(TransportRequest {
                url: self.url.clone(),
                headers: self.headers.clone(),
                body,
            })
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let parsed: GraphQLResponse = match serde_json::from_str(&response.body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(ClientError::InvalidResponse {
                    status: response.status,
                    reason: e.to_string(),
                    body: response.body,
                });
            }
        };
        parsed.into_result()
    }

    fn report(&self, error: ClientError) -> ClientError {
        tracing::warn!(target: TARGET, kind = ?error.kind(), "{error}");
        if let Some(reporter) = &self.error_reporter {
            reporter(&error.to_string(), &error);
        }
        error
    }

    fn ensure_connection(&self) -> Result<Connection> {
        let mut slot = self.connection.lock();
        if let Some(connection) = slot.as_ref() {
            return Ok(connection.clone());
        }

        let (connection, outbound) = Connection::new(ConnectionConfig {
            url: self.channel_url.clone(),
            init_payload: self.init_payload.clone(),
            failure_policy: self.channel_failure,
        });
        connection.set_logger(self.logger.lock().clone());
        *slot = Some(connection.clone());
        drop(slot);

        // The transport may feed frames, and so call the logger, before returning.
        if let Err(e) = self
            .socket
            .open(&self.channel_url, connection.clone(), outbound)
        {
            let mut slot = self.connection.lock();
            if slot.as_ref().is_some_and(|c| c.ptr_eq(&connection)) {
                *slot = None;
            }
            return Err(e);
        }

        tracing::debug!(target: TARGET, url = %self.channel_url, "subscription connection created");
        Ok(connection)
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.url)
            .field("channel_url", &self.channel_url)
            .field("connection", &self.connection_state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let endpoint = Endpoint::new("https://api.example.com/graphql").unwrap();

        assert_eq!(endpoint.url(), "https://api.example.com/graphql");
        assert_eq!(endpoint.channel_url(), "wss://api.example.com/graphql");
        assert_eq!(endpoint.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(endpoint.headers()[ACCEPT], "application/json");
        assert!(endpoint.connection_state().is_none());
    }

    #[test]
    fn test_builder_custom_channel_url() {
        let endpoint = Endpoint::builder("https://api.example.com/graphql")
            .channel_url("wss://ws.example.com/graphql")
            .build()
            .unwrap();

        assert_eq!(endpoint.channel_url(), "wss://ws.example.com/graphql");
    }

    #[test]
    fn test_configured_headers_override_defaults() {
        let endpoint = Endpoint::builder("http://localhost/graphql")
            .header("content-type", "application/graphql+json")
            .bearer_auth("my-token")
            .build()
            .unwrap();

        assert_eq!(
            endpoint.headers()[CONTENT_TYPE],
            "application/graphql+json"
        );
        assert_eq!(endpoint.headers().get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(endpoint.headers()["authorization"], "Bearer my-token");
        assert_eq!(
            endpoint.init_payload,
            serde_json::json!({
                "Authorization": "Bearer my-token",
                "content-type": "application/graphql+json"
            })
        );
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = Endpoint::new("not a url").unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let err = Endpoint::builder("http://localhost/graphql")
            .header("bad header", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidHeader(_)));
    }

    #[test]
    fn test_init_payload_override() {
        let endpoint = Endpoint::builder("http://localhost/graphql")
            .bearer_auth("my-token")
            .init_payload(serde_json::json!({"token": "abc"}))
            .build()
            .unwrap();
        assert_eq!(endpoint.init_payload, serde_json::json!({"token": "abc"}));
    }

    #[test]
    fn test_request_timeout_saturates() {
        let builder = EndpointBuilder::new("http://localhost/graphql").request_timeout(Duration::MAX);
        assert_eq!(builder.config.request_timeout_ms, Some(u64::MAX));

        let builder = EndpointBuilder::new("http://localhost/graphql")
            .request_timeout(Duration::from_millis(1500));
        assert_eq!(builder.config.request_timeout_ms, Some(1500));
    }
}
