//! Pluggable transports.
//!
//! The client talks to the server through two seams:
//!
//! - [`HttpTransport`]: one unary POST per `run`. The default is
//!   [`ReqwestTransport`].
//! - [`SocketTransport`]: the persistent subscription socket. The default is
//!   [`TungsteniteTransport`].
//!
//! Both can be replaced through the endpoint builder, e.g. to run on a
//! different HTTP stack or to drive a [`Connection`](crate::Connection) from
//! tests without a network.

mod unary;
mod socket;

pub use self::unary::{
    HttpTransport, ReqwestTransport, ReqwestTransportBuilder, TransportRequest, TransportResponse,
};
pub use self::socket::{SocketTransport, TungsteniteTransport};
