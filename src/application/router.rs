//! # Command Router
//!
//! Routes one inbound event to the appropriate command handler (in `interface/commands`).
//! Called sequentially by the consumer loop (`spawn_consumer`), which preserves
//! per-applicant order.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use crate::application::conversation::{ConversationEngine, DialogInput};
use crate::application::review::ReviewRouter;
use crate::application::state::IntakeState;
use crate::domain::config::AppConfig;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{ActionToken, Command, InboundEvent, InboundKind};
use crate::interface::commands;

pub struct CommandRouter {
    config: AppConfig,
    engine: Arc<ConversationEngine>,
    review: Arc<ReviewRouter>,
    intake: Arc<IntakeState>,
}

impl CommandRouter {
    pub fn new(
        config: AppConfig,
        engine: Arc<ConversationEngine>,
        review: Arc<ReviewRouter>,
        intake: Arc<IntakeState>,
    ) -> Self {
        Self {
            config,
            engine,
            review,
            intake,
        }
    }

    pub async fn route<C>(&self, chat: &C, event: InboundEvent) -> Result<()>
    where
        C: ChatProvider,
    {
        tracing::info!(
            "Router dispatching {:?} sender='{}' room='{}'",
            event.kind,
            event.sender.user_id,
            event.room_id
        );

        match &event.kind {
            InboundKind::Command(Command::Help) => {
                let is_reviewer = self.review.is_reviewer(&event.sender.user_id);
                commands::help::handle_help(chat, &event, is_reviewer).await?;
            }
            InboundKind::Command(cmd @ (Command::Pause | Command::Resume | Command::Status)) => {
                commands::admin::handle_admin(
                    &self.intake,
                    self.engine.sessions(),
                    &self.review,
                    chat,
                    &event,
                    *cmd,
                )
                .await?;
            }
            InboundKind::Action(ActionToken::Decide {
                verdict,
                applicant_id,
            }) => {
                commands::decision::handle_decision(
                    &self.review,
                    chat,
                    &event,
                    *verdict,
                    applicant_id,
                )
                .await?;
            }
            kind => {
                if let Some(input) = DialogInput::from_kind(kind) {
                    commands::wizard::handle_step(
                        &self.engine,
                        &self.review,
                        chat,
                        &event,
                        input,
                        self.config.application.max_hours,
                    )
                    .await?;
                }
            }
        }
        Ok(())
    }
}

/// Drains the inbox one event at a time. The stop signal is only checked
/// between events: an event that has been taken off the inbox is always routed
/// to completion, and anything still queued stays for the next consumer.
pub fn spawn_consumer<C>(
    router: Arc<CommandRouter>,
    chat: Arc<C>,
    inbox: Arc<Mutex<mpsc::Receiver<InboundEvent>>>,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    C: ChatProvider + 'static,
{
    tokio::spawn(async move {
        let mut rx = inbox.lock().await;
        loop {
            let event = tokio::select! {
                biased;
                _ = stop.wait_for(|stopped| *stopped) => break,
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            if let Err(e) = router.route(chat.as_ref(), event).await {
                tracing::error!("Failed to route event: {}", e);
            }
        }
        tracing::debug!("Inbox consumer stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::state::SessionState;
    use crate::domain::config::AppConfig;
    use crate::domain::types::Sender;
    use crate::interface::commands::parse_inbound;
    use crate::strings::{messages, wizard};
    use crate::test_support::RecordingChat;

    const CONFIG: &str = r#"
services:
  matrix:
    username: recruiter
    password: secret
    homeserver: https://matrix.example.org
reviewers:
  - user_id: "@alice:example.org"
    room_id: "!alice:example.org"
  - user_id: "@bob:example.org"
    room_id: "!bob:example.org"
"#;

    fn router() -> (CommandRouter, Arc<ConversationEngine>, Arc<ReviewRouter>) {
        let config = AppConfig::parse(CONFIG).unwrap();
        let intake = Arc::new(IntakeState::new(true));
        let engine = Arc::new(ConversationEngine::new(
            config.application.clone(),
            intake.clone(),
        ));
        let review = Arc::new(ReviewRouter::new(config.reviewers.clone()));
        (
            CommandRouter::new(config, engine.clone(), review.clone(), intake),
            engine,
            review,
        )
    }

    fn event(user: &str, room: &str, body: &str) -> InboundEvent {
        InboundEvent {
            sender: Sender::new(user).with_display_name("Ann").with_handle("ann"),
            room_id: room.to_string(),
            kind: parse_inbound(body),
        }
    }

    #[tokio::test]
    async fn test_application_round_trip() {
        let (router, engine, review) = router();
        let chat = RecordingChat::new();
        let ann = "@ann:example.org";
        let dm = "!ann-dm:example.org";

        router.route(&chat, event(ann, dm, ".start")).await.unwrap();
        let welcome = chat.sent_to(dm);
        assert_eq!(welcome[0].body, wizard::WELCOME);
        assert_eq!(welcome[0].actions[0].token, "apply");

        for body in [".apply", "Yes", "5", "Growth"] {
            router.route(&chat, event(ann, dm, body)).await.unwrap();
        }
        assert!(engine.sessions().get(ann).await.is_none());
        let to_ann = chat.sent_to(dm);
        assert_eq!(to_ann.last().unwrap().body, wizard::SUBMITTED);

        let notification = &chat.sent_to("!alice:example.org")[0];
        assert!(notification.body.contains("Yes"));
        assert!(notification.body.contains("5.0 h"));
        assert!(notification.body.contains("Growth"));
        assert_eq!(chat.sent_to("!bob:example.org").len(), 1);

        router
            .route(
                &chat,
                event(
                    "@alice:example.org",
                    "!alice:example.org",
                    ".approve_@ann:example.org",
                ),
            )
            .await
            .unwrap();
        assert_eq!(chat.sent_to(dm).last().unwrap().body, messages::APPROVED);
        assert!(review.pending(ann).await.unwrap().is_resolved());
        assert_eq!(chat.edits.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_hours_reprompts() {
        let (router, engine, _) = router();
        let chat = RecordingChat::new();
        let ann = "@ann:example.org";
        for body in [".apply", "No", "twenty-five"] {
            router.route(&chat, event(ann, "!dm", body)).await.unwrap();
        }
        let session = engine.sessions().get(ann).await.unwrap();
        assert_eq!(session.stage.state(), SessionState::AwaitingTimeCommitment);
        assert!(chat.sent_to("!dm").last().unwrap().body.contains("not a number"));
        // One reply per event.
        assert_eq!(chat.sent_to("!dm").len(), 3);
    }

    #[tokio::test]
    async fn test_non_reviewer_decision_acknowledged_to_sender_only() {
        let (router, _, _) = router();
        let chat = RecordingChat::new();
        router
            .route(&chat, event("@eve:x", "!eve", ".reject_@ann:example.org"))
            .await
            .unwrap();
        let sent = chat.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].room_id, "!eve");
        assert_eq!(sent[0].body, messages::AUTH_DENIED);
    }

    #[tokio::test]
    async fn test_pause_requires_reviewer_and_blocks_start() {
        let (router, _, _) = router();
        let chat = RecordingChat::new();

        router.route(&chat, event("@eve:x", "!eve", ".pause")).await.unwrap();
        assert_eq!(chat.sent_to("!eve")[0].body, messages::AUTH_DENIED);

        router
            .route(&chat, event("@bob:example.org", "!bob:example.org", ".pause"))
            .await
            .unwrap();
        assert_eq!(
            chat.sent_to("!bob:example.org")[0].body,
            messages::INTAKE_PAUSED
        );

        router.route(&chat, event("@ann:x", "!dm", ".start")).await.unwrap();
        assert_eq!(chat.sent_to("!dm")[0].body, wizard::INTAKE_CLOSED);
    }

    #[tokio::test]
    async fn test_consumer_finishes_inflight_event_before_stopping() {
        let (router, engine, review) = router();
        let router = Arc::new(router);
        let chat = Arc::new(RecordingChat::new());
        let ann = "@ann:example.org";
        let dm = "!ann-dm:example.org";
        for body in [".apply", "Yes", "5"] {
            router.route(chat.as_ref(), event(ann, dm, body)).await.unwrap();
        }

        let (tx, rx) = mpsc::channel(8);
        tx.send(event(ann, dm, "Growth")).await.unwrap();
        tx.send(event("@eve:x", "!eve", ".help")).await.unwrap();
        let inbox = Arc::new(Mutex::new(rx));
        let (stop_tx, stop_rx) = watch::channel(false);
        let consumer = spawn_consumer(router.clone(), chat.clone(), inbox.clone(), stop_rx);

        // The session disappears once the last answer is being processed.
        while engine.sessions().get(ann).await.is_some() {
            tokio::task::yield_now().await;
        }
        stop_tx.send(true).unwrap();
        consumer.await.unwrap();

        // The application made it to every reviewer and the applicant was told.
        assert_eq!(chat.sent_to("!alice:example.org").len(), 1);
        assert_eq!(chat.sent_to("!bob:example.org").len(), 1);
        assert_eq!(review.pending(ann).await.unwrap().copies.len(), 2);
        assert_eq!(chat.sent_to(dm).last().unwrap().body, wizard::SUBMITTED);

        // The next event was left queued.
        assert!(chat.sent_to("!eve").is_empty());
        assert!(inbox.lock().await.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_help_differs_for_reviewers() {
        let (router, _, _) = router();
        let chat = RecordingChat::new();
        router.route(&chat, event("@ann:x", "!dm", ".help")).await.unwrap();
        router
            .route(&chat, event("@alice:example.org", "!alice:example.org", ".help"))
            .await
            .unwrap();
        assert!(!chat.sent_to("!dm")[0].body.contains("Reviewer"));
        assert!(chat.sent_to("!alice:example.org")[0].body.contains("Reviewer"));
    }
}
