//! Endpoint configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What happens to a channel when the server reports it failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelFailurePolicy {
    /// Remove the channel's registration; later messages for its id are
    /// treated as unknown-channel.
    #[default]
    Close,
    /// Keep the registration so the handler keeps receiving data.
    KeepOpen,
}

/// Serializable configuration for an [`Endpoint`](crate::Endpoint).
///
/// Usually built through [`EndpointBuilder`](crate::EndpointBuilder), but
/// can also be deserialized from an application's own config file:
///
/// ```ignore
/// let config: EndpointConfig = toml::from_str(r#"
///     url = "https://api.example.com/graphql"
///     request_timeout_ms = 10000
///
///     [headers]
///     Authorization = "Bearer token"
/// "#)?;
/// let endpoint = EndpointBuilder::from_config(config).build()?;
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// URL of the unary (HTTP) endpoint.
    pub url: String,
    /// URL of the subscription socket. Derived from `url` when absent.
    #[serde(default)]
    pub channel_url: Option<String>,
    /// Headers sent with every request and in the socket init payload.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Explicit `connection_init` payload, replacing the headers.
    #[serde(default)]
    pub init_payload: Option<Value>,
    /// Timeout for unary requests, in milliseconds.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// User agent for unary requests.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Channel behavior on `error` / `subscription_fail`.
    #[serde(default)]
    pub channel_failure: ChannelFailurePolicy,
}

impl EndpointConfig {
    /// Create a configuration for the given endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            channel_url: None,
            headers: BTreeMap::new(),
            init_payload: None,
            request_timeout_ms: None,
            user_agent: None,
            channel_failure: ChannelFailurePolicy::default(),
        }
    }

    /// The request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// The socket URL: the explicit one, or one derived from `url`.
    pub fn resolved_channel_url(&self) -> String {
        self.channel_url
            .clone()
            .unwrap_or_else(|| derive_channel_url(&self.url))
    }

    /// The payload of the `connection_init` message.
    ///
    /// The explicit init payload if set, otherwise the configured headers.
    pub fn resolved_init_payload(&self) -> Value {
        self.init_payload.clone().unwrap_or_else(|| {
            Value::Object(
                self.headers
                    .iter()
                    .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                    .collect(),
            )
        })
    }
}

/// Convert an HTTP URL to its WebSocket equivalent.
///
/// `http://` becomes `ws://` and `https://` becomes `wss://`; the rest of
/// the URL is kept as is. Other schemes are returned unchanged.
pub fn derive_channel_url(url: &str) -> String {
    if let Some(rest) = strip_scheme(url, "https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = strip_scheme(url, "http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

fn strip_scheme<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    let head = url.get(..scheme.len())?;
    head.eq_ignore_ascii_case(scheme).then(|| &url[scheme.len()..])
}
