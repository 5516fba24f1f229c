//! # Matrix Service Adapter
//!
//! Implements the `ChatProvider` and `Transport` traits for the Matrix protocol using `matrix_sdk`.
//!
//! - `MatrixService` sends markdown messages; actions become a footer listing the
//!   `.token` a user replies with, and removing actions is an `m.replace` edit.
//! - `MatrixTransport` owns login, the sync loop and the single consumer that feeds
//!   inbound events to the `CommandRouter` one at a time.

use async_trait::async_trait;
use matrix_sdk::event_handler::EventHandlerHandle;
use matrix_sdk::room::Room;
use matrix_sdk::ruma::events::relation::Replacement;
use matrix_sdk::ruma::events::room::member::{MembershipState, StrippedRoomMemberEvent};
use matrix_sdk::ruma::events::room::message::{
    MessageType, Relation, RoomMessageEventContent, RoomMessageEventContentWithoutRelation,
    SyncRoomMessageEvent,
};
use matrix_sdk::ruma::{EventId, RoomId};
use matrix_sdk::{Client, config::SyncSettings};
use std::convert::TryFrom;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use crate::application::router::{CommandRouter, spawn_consumer};
use crate::domain::config::MatrixConfig;
use crate::domain::errors::{DeliveryError, TransportError};
use crate::domain::traits::{ChatProvider, Transport};
use crate::domain::types::{Action, InboundEvent, SentMessage, Sender};
use crate::interface::commands::parse_inbound;
use crate::strings::logs;

/// Renders actions as a footer of reply tokens.
pub fn render_with_actions(body: &str, actions: &[Action]) -> String {
    if actions.is_empty() {
        return body.to_string();
    }
    let buttons: Vec<String> = actions
        .iter()
        .map(|a| format!("{} → reply `.{}`", a.label, a.token))
        .collect();
    format!("{body}\n\n{}", buttons.join("  \n"))
}

#[derive(Clone)]
pub struct MatrixService {
    client: Client,
}

impl MatrixService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn room(&self, room_id: &str) -> Result<Room, DeliveryError> {
        let id =
            RoomId::parse(room_id).map_err(|_| DeliveryError::UnknownRoom(room_id.to_string()))?;
        self.client
            .get_room(&id)
            .ok_or_else(|| DeliveryError::UnknownRoom(room_id.to_string()))
    }

    /// Helper to send markdown edits
    async fn internal_edit(room: &Room, event_id: &str, new_content: &str) -> anyhow::Result<()> {
        let event_id = <&EventId>::try_from(event_id)?;
        let mut content = RoomMessageEventContent::text_markdown(new_content);
        let replacement_content = RoomMessageEventContentWithoutRelation::from(content.clone());

        content.relates_to = Some(Relation::Replacement(Replacement::new(
            event_id.to_owned(),
            replacement_content,
        )));

        room.send(content).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatProvider for MatrixService {
    async fn send_message(
        &self,
        room_id: &str,
        content: &str,
        actions: &[Action],
    ) -> Result<SentMessage, DeliveryError> {
        let room = self.room(room_id)?;
        let rendered = render_with_actions(content, actions);
        tracing::info!("Bot sending message to {}: {}", room_id, rendered);
        let response = room
            .send(RoomMessageEventContent::text_markdown(rendered))
            .await
            .map_err(|e| DeliveryError::Send {
                room: room_id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(SentMessage {
            room_id: room_id.to_string(),
            event_id: response.event_id.to_string(),
            body: content.to_string(),
        })
    }

    async fn edit_actions(
        &self,
        message: &SentMessage,
        actions: &[Action],
    ) -> Result<(), DeliveryError> {
        let room = self.room(&message.room_id)?;
        let rendered = render_with_actions(&message.body, actions);
        Self::internal_edit(&room, &message.event_id, &rendered)
            .await
            .map_err(|e| DeliveryError::Edit {
                event: message.event_id.clone(),
                reason: e.to_string(),
            })
    }
}

/// A logged-in client, the handlers registered on it and its inbox consumer.
pub struct MatrixConnection {
    client: Client,
    handlers: Vec<EventHandlerHandle>,
    consumer: JoinHandle<()>,
    stop_consumer: watch::Sender<bool>,
}

/// Position in the sync stream, carried across connections so a reconnect
/// neither replays nor skips events.
#[derive(Debug, Default)]
pub struct SyncCursor {
    next_batch: Mutex<Option<String>>,
}

impl SyncCursor {
    pub async fn current(&self) -> Option<String> {
        self.next_batch.lock().await.clone()
    }

    pub async fn advance(&self, next_batch: &str) {
        *self.next_batch.lock().await = Some(next_batch.to_string());
    }

    async fn settings(&self) -> SyncSettings {
        let settings = SyncSettings::default();
        match self.current().await {
            Some(token) => settings.token(token).timeout(LONG_POLL),
            None => settings,
        }
    }
}

const LONG_POLL: Duration = Duration::from_secs(30);

pub struct MatrixTransport {
    config: MatrixConfig,
    router: Arc<CommandRouter>,
    inbox_tx: mpsc::Sender<InboundEvent>,
    inbox_rx: Arc<Mutex<mpsc::Receiver<InboundEvent>>>,
    started_at: SystemTime,
    cursor: SyncCursor,
}

impl MatrixTransport {
    pub fn new(
        config: MatrixConfig,
        router: Arc<CommandRouter>,
        inbox_tx: mpsc::Sender<InboundEvent>,
        inbox_rx: mpsc::Receiver<InboundEvent>,
    ) -> Self {
        Self {
            config,
            router,
            inbox_tx,
            inbox_rx: Arc::new(Mutex::new(inbox_rx)),
            started_at: SystemTime::now(),
            cursor: SyncCursor::default(),
        }
    }
}

#[async_trait]
impl Transport for MatrixTransport {
    type Connection = MatrixConnection;

    async fn open(&self) -> Result<MatrixConnection, TransportError> {
        let client = Client::builder()
            .homeserver_url(&self.config.homeserver)
            .build()
            .await
            .map_err(|e| TransportError::Failed(e.to_string()))?;

        client
            .matrix_auth()
            .login_username(&self.config.username, &self.config.password)
            .send()
            .await
            .map_err(classify)?;
        tracing::info!("{} ({})", logs::LOGIN_SUCCESS, self.config.username);

        if let Some(name) = &self.config.display_name
            && let Err(e) = client.account().set_display_name(Some(name.as_str())).await
        {
            tracing::warn!("{}", logs::set_display_name_fail(&e.to_string()));
        }

        let tx = self.inbox_tx.clone();
        let started_at = self.started_at;
        let message_handler = client.add_event_handler(move |ev: SyncRoomMessageEvent, room: Room| {
            let tx = tx.clone();
            async move {
                if let Some(event) = to_inbound(&ev, &room, started_at).await
                    && tx.send(event).await.is_err()
                {
                    tracing::warn!("Inbox closed, dropping event from {}", room.room_id());
                }
            }
        });

        // Handle Invites
        let invite_handler =
            client.add_event_handler(|ev: StrippedRoomMemberEvent, room: Room| async move {
                if ev.content.membership == MembershipState::Invite
                    && let Err(e) = room.join().await
                {
                    tracing::warn!("{}", logs::join_invite_fail(&e.to_string()));
                }
            });

        let (stop_consumer, stop_rx) = watch::channel(false);
        let consumer = spawn_consumer(
            self.router.clone(),
            Arc::new(MatrixService::new(client.clone())),
            self.inbox_rx.clone(),
            stop_rx,
        );

        Ok(MatrixConnection {
            client,
            handlers: vec![message_handler, invite_handler],
            consumer,
            stop_consumer,
        })
    }

    async fn run(&self, connection: &MatrixConnection) -> Result<(), TransportError> {
        loop {
            let settings = self.cursor.settings().await;
            let response = connection
                .client
                .sync_once(settings)
                .await
                .map_err(classify)?;
            self.cursor.advance(&response.next_batch).await;
        }
    }

    async fn close(&self, connection: MatrixConnection) {
        for handle in connection.handlers {
            connection.client.remove_event_handler(handle);
        }
        // Let the event being routed finish; queued events wait for the next connection.
        let _ = connection.stop_consumer.send(true);
        if let Err(e) = connection.consumer.await {
            tracing::error!("Inbox consumer ended abnormally: {}", e);
        }
        if let Err(e) = connection.client.matrix_auth().logout().await {
            tracing::warn!("Logout failed: {}", e);
        }
        tracing::info!("Connection closed");
    }
}

/// HTTP 409 from the homeserver means another instance holds the session.
fn classify(err: matrix_sdk::Error) -> TransportError {
    let conflict = err
        .as_client_api_error()
        .is_some_and(|e| e.status_code.as_u16() == 409);
    if conflict {
        TransportError::Conflict(err.to_string())
    } else {
        TransportError::Failed(err.to_string())
    }
}

/// Edits arrive as new messages with an `m.replace` relation.
fn is_edit(content: &RoomMessageEventContent) -> bool {
    matches!(content.relates_to, Some(Relation::Replacement(_)))
}

async fn to_inbound(
    ev: &SyncRoomMessageEvent,
    room: &Room,
    started_at: SystemTime,
) -> Option<InboundEvent> {
    let original = ev.as_original()?;
    if is_edit(&original.content) {
        return None;
    }

    // Ignore events older than start_time
    let ts = ev.origin_server_ts();
    let event_time = UNIX_EPOCH + Duration::from_millis(ts.get().into());
    if event_time < started_at {
        return None;
    }
    if original.sender == room.own_user_id() {
        return None;
    }
    let MessageType::Text(text_content) = &original.content.msgtype else {
        return None;
    };

    let localpart = original.sender.localpart().to_string();
    let display_name = match room.get_member_no_sync(&original.sender).await {
        Ok(Some(member)) => member.display_name().map(str::to_string),
        _ => None,
    }
    .unwrap_or_else(|| localpart.clone());

    tracing::info!(
        "Received message from {}: \n{}",
        original.sender,
        text_content.body
    );
    Some(InboundEvent {
        sender: Sender {
            user_id: original.sender.to_string(),
            display_name,
            handle: Some(localpart),
        },
        room_id: room.room_id().to_string(),
        kind: parse_inbound(&text_content.body),
    })
}
