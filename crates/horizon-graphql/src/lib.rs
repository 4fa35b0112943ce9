//! GraphQL client for Horizon applications.
//!
//! This crate is a transport and multiplexing layer for a GraphQL API:
//!
//! - **Queries and mutations**: one HTTP POST per operation, with uniform
//!   error classification
//! - **Subscriptions**: any number of channels multiplexed over a single
//!   WebSocket speaking the `graphql-subscriptions` protocol
//!
//! It does not parse or validate documents, cache, normalize, batch or retry.
//!
//! # Queries
//!
//! ```ignore
//! use horizon_graphql::Endpoint;
//!
//! let endpoint = Endpoint::builder("https://api.example.com/graphql")
//!     .bearer_auth("my-token")
//!     .build()?;
//!
//! let data = endpoint
//!     .run(
//!         "query($first: Int) { allPosts(first: $first) { nodes { headline } } }",
//!         Some(serde_json::json!({"first": 10})),
//!     )
//!     .await?;
//! ```
//!
//! ## Errors
//!
//! A failed `run` yields a [`ClientError`] whose [`kind`](ClientError::kind)
//! tells apart network failures, unparseable responses, request errors (no
//! data) and field errors (partial data). An optional reporter sees every
//! failure before it is returned:
//!
//! ```ignore
//! let endpoint = Endpoint::builder(url)
//!     .on_error(|message, err| tracing::error!(kind = ?err.kind(), "{message}"))
//!     .build()?;
//! ```
//!
//! # Subscriptions
//!
//! ```ignore
//! let sub = endpoint.subscribe(
//!     "subscription { postAdded { id headline } }",
//!     None,
//!     None,
//! )?;
//!
//! sub.on_data(|data| println!("post added: {data}"))
//!     .on_error(|failure| eprintln!("channel failed: {:?}", failure.message));
//!
//! // Later
//! sub.close();
//! ```
//!
//! The socket is opened on the first `subscribe`. Channels opened before the
//! server acknowledges the handshake are started, in order, once it does.
//!
//! # Logging
//!
//! Diagnostics are emitted through `tracing` under the `horizon_graphql`
//! targets. Connection diagnostics can additionally be routed to a plain
//! callback with [`EndpointBuilder::logger`].

pub mod config;
mod connection;
mod endpoint;
mod error;
pub mod protocol;
mod request;
mod response;
pub mod transport;

pub use config::{ChannelFailurePolicy, EndpointConfig, derive_channel_url};
pub use connection::{
    ChannelFailure, Connection, ConnectionConfig, HandshakeState, LogSink, OutboundFrames,
    Subscription,
};
pub use endpoint::{Endpoint, EndpointBuilder, ErrorReporter};
pub use error::{BoxError, ClientError, ErrorKind, Result};
pub use request::GraphQLRequest;
pub use response::{GraphQLError, GraphQLLocation, GraphQLResponse, PathSegment};
