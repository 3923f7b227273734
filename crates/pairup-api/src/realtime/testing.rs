//! In-memory [`Connector`] for driving a [`ConnectionManager`] without a
//! network.
//!
//! Every connect attempt is reported on a channel together with the
//! server side of the new connection ([`MemoryPeer`]), which the test uses
//! to push frames, observe what the client wrote, and drop the link.
//!
//! Keep the peer alive for as long as the connection should stay up;
//! dropping it reads as an abnormal close.
//!
//! [`ConnectionManager`]: super::ConnectionManager

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

use super::frame::CloseInfo;
use super::socket::{Connector, Transport, TransportEvent};
use crate::error::Error;

/// One call to [`Connector::connect`].
#[derive(Debug)]
pub struct ConnectAttempt {
    pub url: Url,
    /// Runtime clock at the attempt. Meaningful under paused time.
    pub at: Instant,
    /// Server side of the connection; `None` when the attempt was failed.
    pub peer: Option<MemoryPeer>,
}

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    failures: Arc<Mutex<u32>>,
    attempts: mpsc::UnboundedSender<ConnectAttempt>,
}

impl MemoryConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConnectAttempt>) {
        let (attempts, rx) = mpsc::unbounded_channel();
        let connector = Self {
            failures: Arc::new(Mutex::new(0)),
            attempts,
        };
        (connector, rx)
    }

    /// Refuse the next `n` connect attempts.
    pub fn fail_next(&self, n: u32) {
        *self.failures.lock().unwrap_or_else(PoisonError::into_inner) = n;
    }

    fn take_failure(&self) -> bool {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        if *failures == 0 {
            return false;
        }
        *failures -= 1;
        true
    }
}

impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    async fn connect(&self, url: &Url) -> Result<MemoryTransport, Error> {
        let at = Instant::now();

        if self.take_failure() {
            let _ = self.attempts.send(ConnectAttempt {
                url: url.clone(),
                at,
                peer: None,
            });
            return Err(Error::WebSocketConnect("connection refused".into()));
        }

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let peer = MemoryPeer {
            to_client,
            from_client,
            closed: Arc::clone(&closed),
        };
        let _ = self.attempts.send(ConnectAttempt {
            url: url.clone(),
            at,
            peer: Some(peer),
        });

        Ok(MemoryTransport {
            inbound,
            outbound,
            closed,
        })
    }
}

/// Client side of an in-memory connection.
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

impl Transport for MemoryTransport {
    async fn send(&mut self, text: String) -> Result<(), Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::WebSocketSend("connection closed".into()));
        }
        self.outbound
            .send(text)
            .map_err(|_| Error::WebSocketSend("peer gone".into()))
    }

    async fn recv(&mut self) -> TransportEvent {
        self.inbound
            .recv()
            .await
            .unwrap_or_else(|| TransportEvent::Closed(CloseInfo::abnormal("peer dropped")))
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Server side of an in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    to_client: mpsc::UnboundedSender<TransportEvent>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl MemoryPeer {
    /// Push one text frame to the client.
    pub fn deliver(&self, text: impl Into<String>) {
        let _ = self.to_client.send(TransportEvent::Text(text.into()));
    }

    /// Drop the connection from the server side.
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self
            .to_client
            .send(TransportEvent::Closed(CloseInfo::new(code, reason)));
    }

    /// Next frame the client wrote.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    pub fn try_sent(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }

    /// Whether the client closed its side.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
