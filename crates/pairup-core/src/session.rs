// ── Session controller ──
//
// Drives the user-visible chat session (idle → queued → chatting → ended)
// from the connection manager's events, and turns user intents into socket
// commands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use pairup_api::realtime::frame::{
    self, CHAT_ENDED, DISCONNECTED, MATCH_FOUND, MESSAGE, PARTNER_LEFT, QUEUE_JOINED, SERVER_ERROR,
};
use pairup_api::realtime::{
    ChatMessage, ConnectionManager, ConnectionState, Connector, Handler, LookingFor, MatchInfo,
    Payload, ServerNotice, WebSocketConnector, handler,
};
use strum::Display;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;

const UPDATE_CHANNEL_SIZE: usize = 256;

const CONNECTION_LOST_NOTICE: &str = "Lost the connection to the chat server";

// ── Session model ────────────────────────────────────────────────

/// The stranger on the other end of a chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partner {
    pub id: Option<String>,
    pub nickname: Option<String>,
    pub bio: Option<String>,
}

impl Partner {
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("Stranger")
    }
}

impl From<MatchInfo> for Partner {
    fn from(info: MatchInfo) -> Self {
        Self {
            id: info.partner_id,
            nickname: info.partner_nickname,
            bio: info.partner_bio,
        }
    }
}

/// Why a chat ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EndReason {
    #[strum(to_string = "your partner left")]
    PartnerLeft,
    #[strum(to_string = "you left")]
    LeftByUser,
    #[strum(to_string = "the server ended the chat")]
    ServerEnded,
    #[strum(to_string = "the connection was lost")]
    ConnectionLost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Queued { looking_for: LookingFor },
    Chatting { partner: Partner },
    Ended { reason: EndReason },
}

impl SessionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Queued { .. } => "queued",
            Self::Chatting { .. } => "chatting",
            Self::Ended { .. } => "ended",
        }
    }
}

/// Everything a front end renders, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Phase(SessionPhase),
    /// A line from the partner.
    Message(ChatMessage),
    /// A server-side error notice.
    Notice(String),
}

// ── Shared state ─────────────────────────────────────────────────

struct SessionState<C: Connector> {
    manager: ConnectionManager<C>,
    phase: watch::Sender<SessionPhase>,
    updates: broadcast::Sender<SessionUpdate>,
    looking_for: Mutex<LookingFor>,
    /// Set when the socket drops while queued; the queue is rejoined on the
    /// next open.
    requeue: AtomicBool,
}

impl<C: Connector> SessionState<C> {
    fn current(&self) -> SessionPhase {
        self.phase.borrow().clone()
    }

    fn set_phase(&self, next: SessionPhase) {
        let changed = self.phase.send_if_modified(|phase| {
            if *phase == next {
                false
            } else {
                *phase = next.clone();
                true
            }
        });
        if changed {
            info!(phase = next.name(), "session phase changed");
            let _ = self.updates.send(SessionUpdate::Phase(next));
        }
    }

    fn filter(&self) -> LookingFor {
        self.looking_for
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_filter(&self, looking_for: LookingFor) {
        *self.looking_for.lock().unwrap_or_else(PoisonError::into_inner) = looking_for;
    }

    // ── Event reactions ──────────────────────────────────────────

    fn on_queue_joined(&self, _payload: &Payload) {
        if !matches!(self.current(), SessionPhase::Queued { .. }) {
            self.set_phase(SessionPhase::Queued {
                looking_for: self.filter(),
            });
        }
    }

    fn on_match_found(&self, payload: &Payload) {
        let info: MatchInfo = frame::decode(payload).unwrap_or_default();
        self.requeue.store(false, Ordering::SeqCst);
        self.set_phase(SessionPhase::Chatting {
            partner: Partner::from(info),
        });
    }

    fn on_message(&self, payload: &Payload) {
        match frame::decode::<ChatMessage>(payload) {
            Some(message) if !message.content.trim().is_empty() => {
                let _ = self.updates.send(SessionUpdate::Message(message));
            }
            _ => warn!("ignoring chat message without text content"),
        }
    }

    fn on_partner_left(&self, _payload: &Payload) {
        self.end_chat(EndReason::PartnerLeft);
    }

    fn on_chat_ended(&self, _payload: &Payload) {
        self.end_chat(EndReason::ServerEnded);
    }

    fn on_server_error(&self, payload: &Payload) {
        let notice = frame::decode::<ServerNotice>(payload)
            .and_then(|n| n.message)
            .unwrap_or_else(|| "Server error".into());
        warn!(%notice, "server reported an error");
        let _ = self.updates.send(SessionUpdate::Notice(notice));
    }

    fn on_disconnected(&self, _payload: &Payload) {
        match self.current() {
            SessionPhase::Queued { .. } if self.manager.reconnect_scheduled() => {
                debug!("socket dropped while queued, will rejoin on reconnect");
                self.requeue.store(true, Ordering::SeqCst);
            }
            SessionPhase::Queued { .. } => {
                // Reconnects are exhausted; the user has to search again.
                self.requeue.store(false, Ordering::SeqCst);
                let _ = self
                    .updates
                    .send(SessionUpdate::Notice(CONNECTION_LOST_NOTICE.into()));
                self.set_phase(SessionPhase::Idle);
            }
            SessionPhase::Chatting { .. } => self.end_chat(EndReason::ConnectionLost),
            SessionPhase::Idle | SessionPhase::Ended { .. } => {}
        }
    }

    fn end_chat(&self, reason: EndReason) {
        if matches!(self.current(), SessionPhase::Chatting { .. }) {
            self.set_phase(SessionPhase::Ended { reason });
        }
    }

    /// The server does not restore queue membership across connections, so
    /// a reopened socket rejoins on the user's behalf.
    fn resume_queue(&self) {
        if !self.requeue.swap(false, Ordering::SeqCst) {
            return;
        }
        if !matches!(self.current(), SessionPhase::Queued { .. }) {
            return;
        }
        let looking_for = self.filter();
        if self.manager.join_queue(looking_for.clone()) {
            info!(%looking_for, "rejoined matching queue after reconnect");
        } else {
            self.requeue.store(true, Ordering::SeqCst);
        }
    }
}

// ── SessionController ────────────────────────────────────────────

/// One user's chat session on top of a [`ConnectionManager`].
///
/// Subscribes to the manager on construction and unsubscribes on drop.
/// Must be created inside a Tokio runtime.
pub struct SessionController<C: Connector = WebSocketConnector> {
    state: Arc<SessionState<C>>,
    subscriptions: Vec<(&'static str, Handler)>,
    watcher: CancellationToken,
}

impl<C: Connector> SessionController<C> {
    pub fn new(manager: ConnectionManager<C>) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Idle);
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_SIZE);
        let state = Arc::new(SessionState {
            manager,
            phase,
            updates,
            looking_for: Mutex::new(LookingFor::default()),
            requeue: AtomicBool::new(false),
        });

        let subscriptions = vec![
            (QUEUE_JOINED, route(&state, SessionState::on_queue_joined)),
            (MATCH_FOUND, route(&state, SessionState::on_match_found)),
            (MESSAGE, route(&state, SessionState::on_message)),
            (PARTNER_LEFT, route(&state, SessionState::on_partner_left)),
            (CHAT_ENDED, route(&state, SessionState::on_chat_ended)),
            (SERVER_ERROR, route(&state, SessionState::on_server_error)),
            (DISCONNECTED, route(&state, SessionState::on_disconnected)),
        ];
        for (event, h) in &subscriptions {
            state.manager.on(event, Arc::clone(h));
        }

        let watcher = CancellationToken::new();
        tokio::spawn(requeue_on_reconnect(
            Arc::downgrade(&state),
            state.manager.state(),
            watcher.clone(),
        ));

        Self {
            state,
            subscriptions,
            watcher,
        }
    }

    pub fn manager(&self) -> &ConnectionManager<C> {
        &self.state.manager
    }

    pub fn current_phase(&self) -> SessionPhase {
        self.state.current()
    }

    pub fn phase(&self) -> watch::Receiver<SessionPhase> {
        self.state.phase.subscribe()
    }

    pub fn updates(&self) -> broadcast::Receiver<SessionUpdate> {
        self.state.updates.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Connect if needed and join the matching queue.
    pub async fn find_match(&self, looking_for: LookingFor) -> Result<(), CoreError> {
        let previous = self.current_phase();
        if matches!(
            previous,
            SessionPhase::Queued { .. } | SessionPhase::Chatting { .. }
        ) {
            return Err(wrong_phase("look for a match", &previous));
        }

        self.state.manager.connect().await?;
        self.enqueue(previous, looking_for, |manager, filter| {
            manager.join_queue(filter)
        })
    }

    /// Leave the queue.
    pub fn cancel(&self) -> Result<(), CoreError> {
        let phase = self.current_phase();
        if !matches!(phase, SessionPhase::Queued { .. }) {
            return Err(wrong_phase("leave the queue", &phase));
        }
        self.state.requeue.store(false, Ordering::SeqCst);
        if !self.state.manager.leave_queue() {
            debug!("not connected, leaving queue locally");
        }
        self.state.set_phase(SessionPhase::Idle);
        Ok(())
    }

    /// Send a chat line to the partner.
    pub fn say(&self, content: &str) -> Result<(), CoreError> {
        let phase = self.current_phase();
        if !matches!(phase, SessionPhase::Chatting { .. }) {
            return Err(wrong_phase("send a message", &phase));
        }
        if content.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "message is empty".into(),
            });
        }
        if self.state.manager.send_message(content) {
            Ok(())
        } else {
            Err(CoreError::NotConnected)
        }
    }

    /// End the current chat.
    pub fn leave(&self) -> Result<(), CoreError> {
        let phase = self.current_phase();
        if !matches!(phase, SessionPhase::Chatting { .. }) {
            return Err(wrong_phase("leave a chat", &phase));
        }
        if !self.state.manager.leave_chat() {
            debug!("not connected, ending chat locally");
        }
        self.state.set_phase(SessionPhase::Ended {
            reason: EndReason::LeftByUser,
        });
        Ok(())
    }

    /// Skip to the next partner. From an active chat this asks the server
    /// to end it and requeue in one step; otherwise it behaves like
    /// [`find_match`](Self::find_match).
    pub async fn next(&self, looking_for: LookingFor) -> Result<(), CoreError> {
        let phase = self.current_phase();
        match phase {
            SessionPhase::Chatting { .. } => {
                self.enqueue(phase, looking_for, |manager, filter| {
                    manager.next_match(filter)
                })
            }
            SessionPhase::Queued { .. } => Err(wrong_phase("skip ahead", &phase)),
            SessionPhase::Idle | SessionPhase::Ended { .. } => self.find_match(looking_for).await,
        }
    }

    /// Enter Queued, then send the queueing command. The phase flips first
    /// so a fast `match_found` is not overwritten; it is restored if the
    /// command could not be sent.
    fn enqueue(
        &self,
        previous: SessionPhase,
        looking_for: LookingFor,
        send: impl FnOnce(&ConnectionManager<C>, LookingFor) -> bool,
    ) -> Result<(), CoreError> {
        self.state.set_filter(looking_for.clone());
        self.state.set_phase(SessionPhase::Queued {
            looking_for: looking_for.clone(),
        });
        if send(&self.state.manager, looking_for) {
            Ok(())
        } else {
            self.state.set_phase(previous);
            Err(CoreError::NotConnected)
        }
    }
}

impl<C: Connector> Drop for SessionController<C> {
    fn drop(&mut self) {
        self.watcher.cancel();
        for (event, h) in &self.subscriptions {
            self.state.manager.off(event, h);
        }
    }
}

fn wrong_phase(action: &'static str, phase: &SessionPhase) -> CoreError {
    CoreError::WrongPhase {
        action,
        phase: phase.name().to_owned(),
    }
}

/// Wrap a reaction as a manager handler. Holds the state weakly so the
/// manager's handler table does not keep the session alive.
fn route<C: Connector>(
    state: &Arc<SessionState<C>>,
    react: fn(&SessionState<C>, &Payload),
) -> Handler {
    let state = Arc::downgrade(state);
    handler(move |payload| {
        if let Some(state) = state.upgrade() {
            react(&state, payload);
        }
    })
}

async fn requeue_on_reconnect<C: Connector>(
    state: Weak<SessionState<C>>,
    mut connection: watch::Receiver<ConnectionState>,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            () = stop.cancelled() => return,
            changed = connection.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
        if *connection.borrow_and_update() != ConnectionState::Open {
            continue;
        }
        let Some(state) = state.upgrade() else {
            return;
        };
        state.resume_queue();
    }
}
