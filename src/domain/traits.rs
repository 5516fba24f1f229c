//! # Domain Traits
//!
//! Abstract interfaces for the chat platform (messages and connection lifecycle).
//! Allows for pluggable implementations in the Infrastructure layer.

use async_trait::async_trait;

use crate::domain::errors::{DeliveryError, TransportError};
use crate::domain::types::{Action, SentMessage};

/// Abstract interface for a Chat Provider (e.g., Matrix)
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a message to a room, with optional actions rendered by the platform
    async fn send_message(
        &self,
        room_id: &str,
        content: &str,
        actions: &[Action],
    ) -> Result<SentMessage, DeliveryError>;

    /// Replace the actions of a previously sent message (empty slice removes them)
    async fn edit_actions(
        &self,
        message: &SentMessage,
        actions: &[Action],
    ) -> Result<(), DeliveryError>;

    /// Send a plain notice (not tracked/editable)
    async fn send_notification(&self, room_id: &str, content: &str) -> Result<(), DeliveryError> {
        self.send_message(room_id, content, &[]).await.map(|_| ())
    }
}

/// Connection lifecycle to the messaging platform. Only the supervisor drives it.
#[async_trait]
pub trait Transport: Send + Sync {
    type Connection: Send + Sync;

    async fn open(&self) -> Result<Self::Connection, TransportError>;

    /// Pump events until the platform ends the stream or fails.
    async fn run(&self, connection: &Self::Connection) -> Result<(), TransportError>;

    /// Release the connection. Called exactly once per successful `open`.
    async fn close(&self, connection: Self::Connection);
}
