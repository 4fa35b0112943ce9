//! Unary HTTP transport.

use std::time::Duration;

use futures_util::future::BoxFuture;
use http::HeaderMap;

use crate::error::{BoxError, ClientError, Result};

const TARGET: &str = "horizon_graphql::transport";

/// A unary request ready to be sent.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// Target URL.
    pub url: String,
    /// Fully merged request headers.
    pub headers: HeaderMap,
    /// Serialized JSON body.
    pub body: String,
}

/// The raw result of a unary request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl TransportResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends one POST request and reads the whole body.
///
/// Any error returned here is reported as a network error.
pub trait HttpTransport: Send + Sync {
    /// Perform the request.
    fn post(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, std::result::Result<TransportResponse, BoxError>>;
}

/// Builder for [`ReqwestTransport`].
#[derive(Clone, Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: Some(Duration::from_secs(10)),
            user_agent: Some(format!("HorizonGraphQL/{} (Rust)", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl ReqwestTransportBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<ReqwestTransport> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(ref ua) = self.user_agent {
            builder = builder.user_agent(ua);
        }

        let client = builder
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(ReqwestTransport { client })
    }
}

/// [`HttpTransport`] backed by a `reqwest` client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a builder.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }

    /// Wrap an existing `reqwest` client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn post(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, std::result::Result<TransportResponse, BoxError>> {
        Box::pin(async move {
            tracing::trace!(target: TARGET, url = %request.url, bytes = request.body.len(), "POST");
            let response = self
                .client
                .post(&request.url)
                .headers(request.headers)
                .body(request.body)
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            tracing::trace!(target: TARGET, status, bytes = body.len(), "response received");
            Ok(TransportResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = ReqwestTransportBuilder::new();
        assert!(builder.timeout.is_none());
        assert_eq!(builder.connect_timeout, Some(Duration::from_secs(10)));
        assert!(builder.user_agent.unwrap().starts_with("HorizonGraphQL/"));
    }

    #[test]
    fn test_connect_timeout() {
        let builder = ReqwestTransport::builder().connect_timeout(Duration::from_millis(250));
        assert_eq!(builder.connect_timeout, Some(Duration::from_millis(250)));
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_build() {
        let transport = ReqwestTransport::builder()
            .timeout(Duration::from_secs(5))
            .user_agent("Test/1.0")
            .build();
        assert!(transport.is_ok());
    }
}
