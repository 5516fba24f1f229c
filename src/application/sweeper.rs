//! # Session Sweeper
//!
//! Background loop that finds sessions idle past the configured timeout and
//! queues an internal expire event for each. The engine re-checks idleness
//! when the event is processed, so late activity still wins.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::conversation::ConversationEngine;
use crate::domain::types::{Command, InboundEvent, InboundKind, Sender};

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Queues one expire event per idle session. Returns how many were queued.
pub async fn sweep_once(
    engine: &ConversationEngine,
    inbox: &mpsc::Sender<InboundEvent>,
    timeout: Duration,
) -> usize {
    let mut queued = 0;
    for (applicant_id, room_id) in engine.sessions().expired(timeout).await {
        let event = InboundEvent {
            sender: Sender::new(&applicant_id),
            room_id,
            kind: InboundKind::Command(Command::Expire),
        };
        if inbox.send(event).await.is_err() {
            break;
        }
        queued += 1;
    }
    queued
}

pub fn spawn(
    engine: Arc<ConversationEngine>,
    inbox: mpsc::Sender<InboundEvent>,
    timeout: Duration,
) -> JoinHandle<()> {
    let interval = timeout.min(MAX_SWEEP_INTERVAL);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            if inbox.is_closed() {
                break;
            }
            let queued = sweep_once(&engine, &inbox, timeout).await;
            if queued > 0 {
                tracing::info!("Queued {} idle sessions for expiry", queued);
            }
        }
    })
}
