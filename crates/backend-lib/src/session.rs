// ============================
// chat-backend-lib/src/session.rs
// ============================
//! Per-connection session and protocol loop.
//!
//! Lifecycle: CONNECTING (transport accepted) -> AUTHENTICATED (credential
//! resolved) -> ACTIVE (hello sent, subscribed, message loop running) ->
//! CLOSED (deregistered, queue dropped). An unauthenticated connection is
//! closed with code 1008 without ever reaching ACTIVE.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use chat_common::User;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::ChatError;
use crate::events::{ClientEvent, RoomSnapshot, ServerEvent};
use crate::hub::{ConnId, Frame};
use crate::metrics;
use crate::AppState;

/// State for a single authenticated connection: identity, hub membership and
/// the sending half of the outbound queue.
pub struct ConnectionSession {
    state: AppState,
    conn_id: ConnId,
    user: User,
    tx: mpsc::Sender<Frame>,
}

impl ConnectionSession {
    pub fn new(state: AppState, user: User, tx: mpsc::Sender<Frame>) -> Self {
        Self {
            state,
            conn_id: Uuid::new_v4(),
            user,
            tx,
        }
    }

    /// Subscribe this session to every room in the catalog.
    fn register(&self) {
        for room in self.state.registry.rooms() {
            self.state
                .hub
                .subscribe(&room.id, self.conn_id, self.tx.clone());
        }
    }

    /// Drop all hub subscriptions. Must run before the queue receiver is
    /// dropped so that in-flight deliveries cannot race the teardown.
    fn deregister(&self) {
        self.state.hub.unsubscribe_all(self.conn_id);
    }

    /// Assemble the hello event from the room catalog and each room's recent
    /// history.
    async fn hello_event(&self) -> Result<ServerEvent, ChatError> {
        let limit = self.state.settings.history_page_size;
        let mut rooms = Vec::with_capacity(self.state.registry.len());
        for room in self.state.registry.rooms() {
            let page = self.state.store.recent(&room.id, limit).await?;
            rooms.push(RoomSnapshot {
                id: room.id.clone(),
                name: room.name.clone(),
                messages: page.messages,
                has_more_messages: page.has_more,
            });
        }
        Ok(ServerEvent::Hello {
            me: self.user.clone(),
            rooms,
        })
    }

    /// Handle one decoded client event. Errors are surfaced to the caller,
    /// which reports them on this session's own queue; room state is never
    /// touched on the error paths.
    async fn handle_event(&self, evt: ClientEvent) -> Result<(), ChatError> {
        match evt {
            ClientEvent::ClientMessages { room_id, messages } => {
                if !self.state.registry.contains(&room_id) {
                    return Err(ChatError::UnknownRoom(room_id));
                }
                if messages.is_empty() {
                    return Err(ChatError::MalformedRequest(
                        "message batch is empty".to_string(),
                    ));
                }
                let contents: Vec<String> =
                    messages.into_iter().map(|m| m.content).collect();
                let count = contents.len();

                // Hold the room's publish-order lock across append+publish so
                // every subscriber sees batches in append-completion order.
                let order = self.state.hub.order_lock(&room_id);
                let _guard = order.lock().await;

                let batch = self
                    .state
                    .store
                    .append_batch(&room_id, &self.user, contents)
                    .await?;

                let frame: Frame = ServerEvent::ServerMessages {
                    room_id: room_id.clone(),
                    messages: batch,
                }
                .to_json()?
                .into();

                // The append is durable at this point; the sender learns its
                // ids through the broadcast like any other subscriber.
                self.state.hub.publish(&room_id, frame).await;

                ::metrics::counter!(metrics::MESSAGE_APPENDED).increment(count as u64);
                ::metrics::counter!(metrics::MESSAGE_BROADCAST).increment(1);
                Ok(())
            },
            ClientEvent::RequestRoomHistory {
                room_id,
                first_message_id,
            } => {
                if !self.state.registry.contains(&room_id) {
                    return Err(ChatError::UnknownRoom(room_id));
                }
                let page = self
                    .state
                    .store
                    .history_before(
                        &room_id,
                        first_message_id,
                        self.state.settings.history_page_size,
                    )
                    .await?;

                let evt = ServerEvent::RoomHistory {
                    room_id,
                    messages: page.messages,
                    has_more_messages: page.has_more,
                };
                self.tx.send(evt.to_json()?.into()).await?;
                Ok(())
            },
        }
    }
}

/// Drive a WebSocket connection through its whole lifecycle.
pub async fn handle_socket(mut socket: WebSocket, state: AppState, token: Option<String>) {
    // CONNECTING: resolve the credential before anything else is sent.
    let user = match token {
        Some(token) => state.auth.authenticate(&token).await,
        None => Err(ChatError::AuthFailure),
    };
    let user = match user {
        Ok(user) => user,
        Err(err) => {
            tracing::info!(%err, "websocket authentication failed");
            ::metrics::counter!(metrics::WS_AUTH_REJECTED).increment(1);
            // Close rather than fail the upgrade; browser clients cannot read
            // upgrade failure details.
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "authentication required".into(),
                })))
                .await;
            return;
        },
    };

    // AUTHENTICATED
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Frame>(state.settings.outbound_queue_capacity);
    let session = ConnectionSession::new(state, user, tx);

    // Subscribe before taking the history snapshot: anything published while
    // hello is assembled queues up behind it and is delivered afterwards, in
    // order. A message appended inside that window can appear both in the
    // hello history and in the queued broadcast; clients dedupe on id.
    session.register();

    let hello_json = match session.hello_event().await.and_then(|evt| evt.to_json()) {
        Ok(json) => json,
        Err(err) => {
            tracing::error!(%err, "failed to assemble hello event");
            session.deregister();
            return;
        },
    };
    if ws_tx.send(Message::Text(hello_json.into())).await.is_err() {
        session.deregister();
        return;
    }

    // ACTIVE
    tracing::info!(
        user = %session.user.username,
        conn = %session.conn_id,
        "chat session active"
    );

    // Drain the outbound queue; the hub is the only other writer into it.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_tx
                .send(Message::Text(frame.to_string().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Text(text) => {
                let evt = match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(evt) => evt,
                    Err(err) => {
                        // An undecodable frame drops the connection; a valid
                        // frame that fails validation only rejects the
                        // request.
                        tracing::debug!(%err, "closing session on malformed frame");
                        break;
                    },
                };

                if let Err(err) = session.handle_event(evt).await {
                    tracing::debug!(%err, "rejected client request");
                    let Ok(rejection) = ServerEvent::from_error(&err).to_json() else {
                        break;
                    };
                    if session.tx.send(rejection.into()).await.is_err() {
                        break;
                    }
                }
            },
            Message::Close(_) => break,
            _ => {},
        }
    }

    // CLOSED: membership goes first, then the queue.
    session.deregister();
    send_task.abort();

    tracing::info!(conn = %session.conn_id, "chat session closed");
}
