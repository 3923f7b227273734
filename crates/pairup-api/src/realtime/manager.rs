// ── Connection manager ──
//
// Owns the single chat socket: connect with a Connecting-phase guard,
// ordered inbound dispatch, synchronous outbound writes, and bounded
// linear-backoff reconnection after the socket drops.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::config::RealtimeConfig;
use super::frame::{self, CloseInfo, Command, DISCONNECTED, InboundFrame, LookingFor, Payload, ServerEvent};
use super::handlers::{Handler, HandlerRegistry, invoke_all};
use super::socket::{Connector, Transport, TransportEvent, WebSocketConnector};
use crate::error::Error;
use crate::identity::{DeviceIdentity, IdentitySlot};

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── ConnectionState ──────────────────────────────────────────────

/// Lifecycle of the chat socket, observable through
/// [`ConnectionManager::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    /// A caller-initiated close is in progress.
    Closing,
}

/// Outcome of the in-flight connect attempt, shared by every caller that
/// arrives while Connecting.
type PendingConnect = Shared<BoxFuture<'static, Result<(), String>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Caller,
    Reconnect,
}

/// Mutable connection bookkeeping. Guarded by one mutex that is never held
/// across an `.await` or while handlers run.
#[derive(Default)]
struct Link {
    /// Bumped by every connect attempt and by `disconnect()`. Tasks carry
    /// the generation they were started for and go quiet once it moves on.
    generation: u64,
    attempts: u32,
    outbound: Option<mpsc::UnboundedSender<String>>,
    session: Option<CancellationToken>,
    reconnect: Option<CancellationToken>,
    pending: Option<PendingConnect>,
}

enum Settled<T> {
    Open,
    Failed(String),
    ReconnectFailed(String),
    Stale(Option<T>),
}

// ── ConnectionManager ────────────────────────────────────────────

/// Manager for the persistent chat connection.
///
/// Cheaply cloneable via `Arc<Inner>`. Event subscriptions live on the
/// manager, not the socket, so they survive reconnects. The live socket is
/// driven by a background task; call [`disconnect`](Self::disconnect) to
/// tear it down.
pub struct ConnectionManager<C: Connector = WebSocketConnector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for ConnectionManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<C> {
    config: RealtimeConfig,
    identity: IdentitySlot,
    connector: C,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<Arc<ServerEvent>>,
    handlers: Mutex<HandlerRegistry>,
    link: Mutex<Link>,
}

impl<C> Inner<C> {
    fn link(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handlers(&self) -> MutexGuard<'_, HandlerRegistry> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}

impl ConnectionManager<WebSocketConnector> {
    /// Manager that opens real WebSocket connections.
    pub fn new(config: RealtimeConfig, identity: IdentitySlot) -> Self {
        Self::with_connector(config, identity, WebSocketConnector)
    }
}

impl<C: Connector> ConnectionManager<C> {
    pub fn with_connector(config: RealtimeConfig, identity: IdentitySlot, connector: C) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                config,
                identity,
                connector,
                state,
                events,
                handlers: Mutex::new(HandlerRegistry::default()),
                link: Mutex::new(Link::default()),
            }),
        }
    }

    /// Set the device identity used in the socket URL.
    pub fn configure(&self, identity: DeviceIdentity) -> Result<(), Error> {
        self.inner.identity.configure(identity)
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.inner.config
    }

    // ── State observation ────────────────────────────────────────

    pub fn current_state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Consecutive drops since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.link().attempts
    }

    /// Whether an automatic reconnect is waiting on its timer. False once
    /// the attempt ceiling is reached, until the next explicit `connect()`.
    pub fn reconnect_scheduled(&self) -> bool {
        self.inner.link().reconnect.is_some()
    }

    /// Typed stream of every dispatched event, including `Disconnected` and
    /// frames of unknown type.
    pub fn events(&self) -> broadcast::Receiver<Arc<ServerEvent>> {
        self.inner.events.subscribe()
    }

    // ── Subscriptions ────────────────────────────────────────────

    /// Subscribe `handler` to `event`. Registering the same handler twice
    /// makes it fire twice.
    pub fn on(&self, event: &str, handler: Handler) {
        self.inner.handlers().on(event, handler);
    }

    /// Remove one registration of `handler` from `event`.
    pub fn off(&self, event: &str, handler: &Handler) -> bool {
        self.inner.handlers().off(event, handler)
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.inner.handlers().count(event)
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Open the chat socket.
    ///
    /// Resolves immediately when already open. While a connect is in
    /// flight, every caller awaits that same attempt. A failure here is
    /// returned to the caller and does not start the reconnect backoff.
    pub async fn connect(&self) -> Result<(), Error> {
        let pending = {
            let mut link = self.inner.link();
            match self.current_state() {
                ConnectionState::Open => return Ok(()),
                ConnectionState::Connecting if link.pending.is_some() => link.pending.clone(),
                _ => None,
            }
            .map_or_else(|| self.begin_connect(&mut link, Trigger::Caller), Ok)?
        };
        pending.await.map_err(Error::WebSocketConnect)
    }

    /// Close the socket without scheduling a reconnect.
    ///
    /// Cancels any scheduled reconnect and any in-flight connect. The
    /// attempt counter is left as is. No `disconnected` event is emitted
    /// for a caller-initiated close.
    pub fn disconnect(&self) {
        let mut link = self.inner.link();
        link.generation += 1;
        if let Some(timer) = link.reconnect.take() {
            timer.cancel();
        }
        link.pending = None;
        link.outbound = None;

        let next = match link.session.take() {
            Some(session) => {
                session.cancel();
                ConnectionState::Closing
            }
            None => ConnectionState::Disconnected,
        };
        self.inner.set_state(next);
        info!("chat socket disconnect requested");
    }

    // ── Outbound ─────────────────────────────────────────────────

    /// Write `{type: kind, ...payload}`. Returns `false`, without writing,
    /// unless the socket is open.
    pub fn send(&self, kind: &str, payload: &Payload) -> bool {
        let link = self.inner.link();
        if self.current_state() != ConnectionState::Open {
            debug!(kind, "not sending: socket is not open");
            return false;
        }
        let Some(outbound) = link.outbound.as_ref() else {
            return false;
        };
        debug!(kind, "sending frame");
        outbound.send(frame::encode(kind, payload)).is_ok()
    }

    pub fn send_command(&self, command: &Command) -> bool {
        self.send(command.kind(), &command.payload())
    }

    pub fn join_queue(&self, looking_for: LookingFor) -> bool {
        self.send_command(&Command::JoinQueue { looking_for })
    }

    pub fn leave_queue(&self) -> bool {
        self.send_command(&Command::LeaveQueue)
    }

    pub fn send_message(&self, content: impl Into<String>) -> bool {
        self.send_command(&Command::SendMessage {
            content: content.into(),
        })
    }

    pub fn leave_chat(&self) -> bool {
        self.send_command(&Command::LeaveChat)
    }

    pub fn next_match(&self, looking_for: LookingFor) -> bool {
        self.send_command(&Command::NextMatch { looking_for })
    }

    // ── Connect internals ────────────────────────────────────────

    /// Start a connect attempt on a background task and record it as the
    /// pending attempt. Must be called with the link locked.
    fn begin_connect(&self, link: &mut Link, trigger: Trigger) -> Result<PendingConnect, Error> {
        let identity = self.inner.identity.get()?;
        let url = self.inner.config.chat_url(identity)?;

        if let Some(timer) = link.reconnect.take() {
            timer.cancel();
        }
        link.generation += 1;
        let generation = link.generation;
        self.inner.set_state(ConnectionState::Connecting);

        let manager = self.clone();
        let task = tokio::spawn(async move { manager.open(url, generation, trigger).await });
        let pending = async move {
            task.await
                .unwrap_or_else(|e| Err(format!("connect task failed: {e}")))
        }
        .boxed()
        .shared();

        link.pending = Some(pending.clone());
        Ok(pending)
    }

    async fn open(self, url: Url, generation: u64, trigger: Trigger) -> Result<(), String> {
        info!(%url, ?trigger, "opening chat socket");
        let result = self.inner.connector.connect(&url).await;

        match self.settle(result, generation, trigger) {
            Settled::Open => {
                info!("chat socket open");
                Ok(())
            }
            Settled::Failed(reason) => Err(reason),
            Settled::ReconnectFailed(reason) => {
                self.handle_close(generation, CloseInfo::abnormal(reason.clone()));
                Err(reason)
            }
            Settled::Stale(transport) => {
                if let Some(mut transport) = transport {
                    transport.close().await;
                }
                debug!("connect attempt superseded");
                Err("connection attempt cancelled".into())
            }
        }
    }

    /// Record the result of a connect attempt. On success the session task
    /// is spawned here, under the lock, so no send can slip in between the
    /// state flip and the outbound queue being installed.
    fn settle(
        &self,
        result: Result<C::Transport, Error>,
        generation: u64,
        trigger: Trigger,
    ) -> Settled<C::Transport> {
        let mut link = self.inner.link();
        if link.generation != generation {
            return Settled::Stale(result.ok());
        }
        link.pending = None;

        match result {
            Ok(transport) => {
                link.attempts = 0;
                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                let session = CancellationToken::new();
                link.outbound = Some(outbound_tx);
                link.session = Some(session.clone());
                self.inner.set_state(ConnectionState::Open);
                tokio::spawn(
                    self.clone()
                        .run_session(transport, outbound_rx, session, generation),
                );
                Settled::Open
            }
            Err(e) => {
                warn!(error = %e, ?trigger, "chat socket connect failed");
                match trigger {
                    Trigger::Caller => {
                        self.inner.set_state(ConnectionState::Disconnected);
                        Settled::Failed(e.to_string())
                    }
                    Trigger::Reconnect => Settled::ReconnectFailed(e.to_string()),
                }
            }
        }
    }

    // ── Session task ─────────────────────────────────────────────

    /// Drive one open socket: write queued frames, dispatch inbound frames
    /// in arrival order, and report the close.
    async fn run_session(
        self,
        mut transport: C::Transport,
        mut outbound: mpsc::UnboundedReceiver<String>,
        session: CancellationToken,
        generation: u64,
    ) {
        loop {
            tokio::select! {
                biased;
                () = session.cancelled() => {
                    // Frames accepted by send() before the disconnect still go out
                    while let Ok(text) = outbound.try_recv() {
                        if let Err(e) = transport.send(text).await {
                            debug!(error = %e, "dropping queued frames on close");
                            break;
                        }
                    }
                    transport.close().await;
                    self.finish_disconnect();
                    debug!("chat socket closed by caller");
                    return;
                }
                Some(text) = outbound.recv() => {
                    if let Err(e) = transport.send(text).await {
                        warn!(error = %e, "failed to write frame");
                    }
                }
                event = transport.recv() => match event {
                    TransportEvent::Text(text) => self.dispatch_text(&text),
                    TransportEvent::Closed(info) => {
                        self.handle_close(generation, info);
                        return;
                    }
                },
            }
        }
    }

    fn finish_disconnect(&self) {
        let _link = self.inner.link();
        self.inner.state.send_if_modified(|state| {
            if *state == ConnectionState::Closing {
                *state = ConnectionState::Disconnected;
                true
            } else {
                false
            }
        });
    }

    // ── Inbound dispatch ─────────────────────────────────────────

    fn dispatch_text(&self, text: &str) {
        match InboundFrame::parse(text) {
            Ok(frame) => self.dispatch(frame),
            Err(e) => warn!(error = %e, "dropping malformed frame"),
        }
    }

    /// Run the handlers subscribed to the frame's type, then publish the
    /// typed event. Handlers run with no lock held.
    fn dispatch(&self, frame: InboundFrame) {
        let handlers = self.inner.handlers().snapshot(&frame.kind);
        if handlers.is_empty() {
            debug!(event = %frame.kind, "no handlers subscribed");
        } else {
            invoke_all(&frame.kind, &handlers, &frame.payload);
        }

        // No receivers is fine
        let _ = self.inner.events.send(Arc::new(ServerEvent::from_frame(frame)));
    }

    // ── Close & reconnect ────────────────────────────────────────

    /// The socket dropped (or an automatic reconnect failed): go
    /// Disconnected, emit `disconnected`, and schedule the next attempt
    /// while under the ceiling.
    fn handle_close(&self, generation: u64, info: CloseInfo) {
        let policy = self.inner.config.reconnect;
        let retry = {
            let mut link = self.inner.link();
            if link.generation != generation {
                debug!("ignoring close of a superseded connection");
                return;
            }
            link.outbound = None;
            link.session = None;
            link.pending = None;
            self.inner.set_state(ConnectionState::Disconnected);

            if link.attempts < policy.max_attempts {
                link.attempts += 1;
                let timer = CancellationToken::new();
                link.reconnect = Some(timer.clone());
                Some((link.attempts, policy.delay_for(link.attempts), timer))
            } else {
                None
            }
        };

        warn!(code = info.code, reason = %info.reason, "chat socket closed");
        self.dispatch(InboundFrame::new(DISCONNECTED, info.to_payload()));

        match retry {
            Some((attempt, delay, timer)) => {
                info!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "scheduling reconnect"
                );
                tokio::spawn(self.clone().reconnect_after(delay, timer));
            }
            None => warn!(
                max_attempts = policy.max_attempts,
                "reconnect limit reached, waiting for an explicit connect"
            ),
        }
    }

    async fn reconnect_after(self, delay: Duration, timer: CancellationToken) {
        tokio::select! {
            biased;
            () = timer.cancelled() => debug!("scheduled reconnect cancelled"),
            () = tokio::time::sleep(delay) => self.reconnect(&timer),
        }
    }

    fn reconnect(&self, timer: &CancellationToken) {
        let mut link = self.inner.link();
        // disconnect() cancels under this lock, so this check is final
        if timer.is_cancelled() {
            return;
        }
        link.reconnect = None;
        if self.current_state() != ConnectionState::Disconnected {
            return;
        }
        if let Err(e) = self.begin_connect(&mut link, Trigger::Reconnect) {
            warn!(error = %e, "reconnect skipped");
        }
    }
}
