//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Clients declare who they are in the upgrade request: the
//! `x-session-id` header names the swap session, the `x-address` header
//! carries the participant address. Upgrades missing either header are
//! rejected with `400 Bad Request` before a connection is produced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectIdentity, ConnectionId, Transport, TransportError};

/// Header naming the swap session the client wants to join.
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Header carrying the client's self-declared participant address.
pub const ADDRESS_HEADER: &str = "x-address";

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        // The identity headers are pulled out of the upgrade request by
        // the handshake callback. If either is missing, the upgrade is
        // answered with 400 and `accept_hdr_async` returns an error.
        let mut identity: Option<ConnectIdentity> = None;
        let callback = |req: &Request, resp: Response| {
            match extract_identity(req) {
                Some(found) => {
                    identity = Some(found);
                    Ok(resp)
                }
                None => {
                    let mut reject = ErrorResponse::new(Some(format!(
                        "missing {SESSION_ID_HEADER} or {ADDRESS_HEADER} header"
                    )));
                    *reject.status_mut() = StatusCode::BAD_REQUEST;
                    Err(reject)
                }
            }
        };

        let ws = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .map_err(|e| {
                TransportError::HandshakeRejected(e.to_string())
            })?;

        let identity = identity.ok_or_else(|| {
            TransportError::HandshakeRejected(
                "upgrade completed without identity".into(),
            )
        })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(
            %id,
            %addr,
            session_id = %identity.session_id,
            address = %identity.address,
            "accepted WebSocket connection"
        );

        Ok(WebSocketConnection {
            id,
            identity,
            ws: Arc::new(Mutex::new(ws)),
        })
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Reads the identity headers from an upgrade request.
///
/// Returns `None` when either header is missing, empty, or not valid
/// UTF-8 — all treated as an undeclared identity.
fn extract_identity(req: &Request) -> Option<ConnectIdentity> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    };
    Some(ConnectIdentity {
        session_id: header(SESSION_ID_HEADER)?,
        address: header(ADDRESS_HEADER)?,
    })
}

/// A single WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    identity: ConnectIdentity,
    ws: Arc<Mutex<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        use futures_util::SinkExt;
        let msg = Message::Binary(data.to_vec().into());
        self.ws.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        use futures_util::StreamExt;
        loop {
            let msg = self.ws.lock().await.next().await;
            match msg {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.ws.lock().await.close(None).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn identity(&self) -> &ConnectIdentity {
        &self.identity
    }
}
