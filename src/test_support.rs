//! Recording `ChatProvider` and log capture used by the unit tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::io;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::errors::DeliveryError;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{Action, SentMessage};

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub room_id: String,
    pub body: String,
    pub actions: Vec<Action>,
}

#[derive(Default)]
pub struct RecordingChat {
    pub sent: Mutex<Vec<Outbound>>,
    pub edits: Mutex<Vec<(SentMessage, Vec<Action>)>>,
    unreachable: HashSet<String>,
    uneditable: HashSet<String>,
    next_id: AtomicUsize,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends to this room fail.
    pub fn unreachable(mut self, room_id: &str) -> Self {
        self.unreachable.insert(room_id.to_string());
        self
    }

    /// Edits of messages in this room fail.
    pub fn uneditable(mut self, room_id: &str) -> Self {
        self.uneditable.insert(room_id.to_string());
        self
    }

    pub fn sent_to(&self, room_id: &str) -> Vec<Outbound> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect()
    }

    pub fn edits_in(&self, room_id: &str) -> Vec<(SentMessage, Vec<Action>)> {
        self.edits
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m.room_id == room_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChatProvider for RecordingChat {
    async fn send_message(
        &self,
        room_id: &str,
        content: &str,
        actions: &[Action],
    ) -> Result<SentMessage, DeliveryError> {
        // Give concurrently running handlers a chance to interleave.
        tokio::task::yield_now().await;
        if self.unreachable.contains(room_id) {
            return Err(DeliveryError::Send {
                room: room_id.to_string(),
                reason: "unreachable".to_string(),
            });
        }
        self.sent.lock().unwrap().push(Outbound {
            room_id: room_id.to_string(),
            body: content.to_string(),
            actions: actions.to_vec(),
        });
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(SentMessage {
            room_id: room_id.to_string(),
            event_id: format!("$event{id}"),
            body: content.to_string(),
        })
    }

    async fn edit_actions(
        &self,
        message: &SentMessage,
        actions: &[Action],
    ) -> Result<(), DeliveryError> {
        tokio::task::yield_now().await;
        if self.uneditable.contains(&message.room_id) {
            return Err(DeliveryError::Edit {
                event: message.event_id.clone(),
                reason: "forbidden".to_string(),
            });
        }
        self.edits
            .lock()
            .unwrap()
            .push((message.clone(), actions.to_vec()));
        Ok(())
    }
}

/// Collects formatted `tracing` output for the current thread while the guard
/// returned by `install` is alive.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Lines logged at `level` (e.g. `"ERROR"`) that contain `needle`.
    pub fn matching(&self, level: &str, needle: &str) -> Vec<String> {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .filter(|l| l.contains(level) && l.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
