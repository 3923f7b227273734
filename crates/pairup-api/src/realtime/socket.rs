// Transport seam between the connection manager and the network.
//
// `Connector` opens one duplex text transport per connection attempt; the
// manager owns it for the connection's lifetime. `WebSocketConnector` is
// the tokio-tungstenite implementation used in production.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::frame::CloseInfo;
use crate::error::Error;

/// Close code reported when a close frame arrives without a status.
const NO_STATUS: u16 = 1005;

/// What a transport yields when read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One text frame.
    Text(String),
    /// The connection is gone. No further events follow.
    Closed(CloseInfo),
}

/// One open duplex text connection.
///
/// `recv` must be cancel-safe: the manager polls it inside `select!`
/// alongside the outbound queue.
pub trait Transport: Send + 'static {
    fn send(&mut self, text: String) -> impl Future<Output = Result<(), Error>> + Send;

    fn recv(&mut self) -> impl Future<Output = TransportEvent> + Send;

    /// Close the connection. Errors are swallowed; the transport is
    /// dropped right after.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens transports. Shared by every connection attempt of a manager.
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    fn connect(&self, url: &Url) -> impl Future<Output = Result<Self::Transport, Error>> + Send;
}

// ── WebSocket implementation ─────────────────────────────────────────

/// Connector backed by `tokio_tungstenite::connect_async`.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, url: &Url) -> Result<WebSocketTransport, Error> {
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
        Ok(WebSocketTransport { stream })
    }
}

pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<(), Error> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| Error::WebSocketSend(e.to_string()))
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return TransportEvent::Text(text.as_str().to_owned()),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return TransportEvent::Text(text),
                    Err(_) => tracing::debug!("ignoring non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let info = frame.map_or_else(
                        || CloseInfo::new(NO_STATUS, ""),
                        |cf| CloseInfo::new(u16::from(cf.code), cf.reason.as_str().to_owned()),
                    );
                    return TransportEvent::Closed(info);
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                    // tungstenite answers pings itself
                }
                Some(Err(e)) => return TransportEvent::Closed(close_from_error(&e)),
                None => return TransportEvent::Closed(CloseInfo::abnormal("stream ended")),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "error while closing chat socket");
        }
    }
}

fn close_from_error(err: &tungstenite::Error) -> CloseInfo {
    CloseInfo::abnormal(err.to_string())
}
