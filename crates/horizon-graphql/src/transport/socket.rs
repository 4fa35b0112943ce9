//! WebSocket transport for the subscription connection.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::connection::{Connection, OutboundFrames};
use crate::error::{ClientError, Result};
use crate::protocol::SUBPROTOCOL;

const TARGET: &str = "horizon_graphql::transport";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens the persistent socket for a [`Connection`].
///
/// An implementation must, once its socket is open, call
/// [`Connection::transport_opened`], write every frame received on
/// `outbound` as a text message, and hand each inbound text message to
/// [`Connection::handle_text`] in arrival order. Socket failures are
/// reported through [`Connection::transport_failed`] or
/// [`Connection::transport_closed`].
///
/// `open` is called synchronously from `subscribe`; it should start the
/// connection attempt and return without waiting for it.
pub trait SocketTransport: Send + Sync {
    /// Start connecting to `url` on behalf of `connection`.
    fn open(&self, url: &str, connection: Connection, outbound: OutboundFrames) -> Result<()>;
}

/// [`SocketTransport`] backed by `tokio-tungstenite`.
///
/// The socket is driven by a task spawned on the current tokio runtime.
/// There is no reconnection: when the socket drops, the failure is reported
/// to the connection and the task ends.
#[derive(Clone, Debug, Default)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    /// Create the transport.
    pub fn new() -> Self {
        Self
    }

    fn build_request(url: &str) -> Result<Request> {
        let mut request = url
            .into_client_request()
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        request.headers_mut().insert(
            http::header::SEC_WEBSOCKET_PROTOCOL,
            http::HeaderValue::from_static(SUBPROTOCOL),
        );
        Ok(request)
    }

    async fn drive(request: Request, connection: Connection, mut outbound: OutboundFrames) {
        let ws_stream: WsStream = match tokio_tungstenite::connect_async(request).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                connection.transport_failed(&e.to_string());
                return;
            }
        };
        tracing::debug!(target: TARGET, url = %connection.url(), "subscription socket connected");

        let (mut write, mut read) = ws_stream.split();
        connection.transport_opened();

        loop {
            tokio::select! {
                frame = outbound.recv() => {
                    match frame {
                        Some(text) => {
                            if let Err(e) = write.send(Message::Text(text.into())).await {
                                connection.transport_failed(&e.to_string());
                                break;
                            }
                        }
                        None => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            connection.handle_text(text.as_str());
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            connection.transport_closed();
                            break;
                        }
                        Some(Ok(_)) => {
                            // Binary frames are not part of the protocol; ping/pong is automatic.
                        }
                        Some(Err(e)) => {
                            connection.transport_failed(&e.to_string());
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl SocketTransport for TungsteniteTransport {
    fn open(&self, url: &str, connection: Connection, outbound: OutboundFrames) -> Result<()> {
        let request = Self::build_request(url)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        runtime.spawn(Self::drive(request, connection, outbound));
        Ok(())
    }
}
