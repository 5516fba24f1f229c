//! # Conversation Engine
//!
//! Per-applicant dialog that collects experience, daily hours and motivation.
//! `transition` is the pure step function; `ConversationEngine` applies it to the
//! `SessionStore` and builds the `ApplicationRecord` once the last answer arrives.

use chrono::Utc;
use std::sync::Arc;
use tokio::time::Instant;

use crate::application::state::{IntakeState, SessionState, SessionStore, Stage};
use crate::domain::config::ApplicationConfig;
use crate::domain::errors::ValidationError;
use crate::domain::types::{ApplicationRecord, Command, InboundKind, Sender};
use crate::domain::validation::{parse_hours, truncate_chars};

/// Input understood by the dialog.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogInput {
    Start,
    Apply,
    Cancel,
    Expire,
    Text(String),
}

impl DialogInput {
    /// Maps an inbound event onto dialog input. Reviewer-only commands and
    /// decision tokens are not dialog input.
    pub fn from_kind(kind: &InboundKind) -> Option<Self> {
        match kind {
            InboundKind::Command(Command::Start) => Some(DialogInput::Start),
            InboundKind::Command(Command::Cancel) => Some(DialogInput::Cancel),
            InboundKind::Command(Command::Expire) => Some(DialogInput::Expire),
            InboundKind::Action(crate::domain::types::ActionToken::Apply) => {
                Some(DialogInput::Apply)
            }
            InboundKind::Text(body) => Some(DialogInput::Text(body.clone())),
            _ => None,
        }
    }
}

/// What the applicant is told after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Welcome,
    AskExperience,
    AskHours,
    InvalidHours(ValidationError),
    /// Blank answer; the question for the carried state is asked again.
    EmptyAnswer(SessionState),
    AskMotivation,
    Submitted,
    Cancelled,
    Expired,
    IdleHint,
    IntakeClosed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedFields {
    pub experience: String,
    pub hours: f64,
    pub motivation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// `None` destroys the session.
    pub next: Option<Stage>,
    pub reply: Reply,
    pub completed: Option<CompletedFields>,
}

impl Transition {
    fn to(next: Stage, reply: Reply) -> Self {
        Self {
            next: Some(next),
            reply,
            completed: None,
        }
    }

    fn destroy(reply: Reply) -> Self {
        Self {
            next: None,
            reply,
            completed: None,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.next, &self.completed) {
            (_, Some(_)) => SessionState::Completed,
            (Some(stage), None) => stage.state(),
            (None, None) => SessionState::Idle,
        }
    }
}

pub fn transition(stage: &Stage, input: &DialogInput, limits: &ApplicationConfig) -> Transition {
    match (stage, input) {
        (_, DialogInput::Cancel) => Transition::destroy(Reply::Cancelled),
        (_, DialogInput::Expire) => Transition::destroy(Reply::Expired),
        // Idle is never stored; restarting mid-dialog drops the collected answers.
        (_, DialogInput::Start) => Transition::destroy(Reply::Welcome),
        (_, DialogInput::Apply) => Transition::to(Stage::AwaitingExperience, Reply::AskExperience),
        (Stage::Idle, DialogInput::Text(_)) => Transition::destroy(Reply::IdleHint),
        (Stage::AwaitingExperience, DialogInput::Text(body)) => {
            let experience = truncate_chars(body, limits.experience_max_chars);
            if experience.is_empty() {
                return Transition::to(stage.clone(), Reply::EmptyAnswer(stage.state()));
            }
            Transition::to(Stage::AwaitingTimeCommitment { experience }, Reply::AskHours)
        }
        (Stage::AwaitingTimeCommitment { experience }, DialogInput::Text(body)) => {
            match parse_hours(body, limits.max_hours) {
                Ok(hours) => Transition::to(
                    Stage::AwaitingMotivation {
                        experience: experience.clone(),
                        hours,
                    },
                    Reply::AskMotivation,
                ),
                Err(e) => Transition::to(stage.clone(), Reply::InvalidHours(e)),
            }
        }
        (Stage::AwaitingMotivation { experience, hours }, DialogInput::Text(body)) => {
            let motivation = truncate_chars(body, limits.motivation_max_chars);
            if motivation.is_empty() {
                return Transition::to(stage.clone(), Reply::EmptyAnswer(stage.state()));
            }
            Transition {
                next: None,
                reply: Reply::Submitted,
                completed: Some(CompletedFields {
                    experience: experience.clone(),
                    hours: *hours,
                    motivation,
                }),
            }
        }
    }
}

/// Result of handling one event for one applicant.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// `None` only for a stale expire event, which is dropped silently.
    pub reply: Option<Reply>,
    pub state: SessionState,
    pub record: Option<ApplicationRecord>,
}

pub struct ConversationEngine {
    limits: ApplicationConfig,
    store: SessionStore,
    intake: Arc<IntakeState>,
}

impl ConversationEngine {
    pub fn new(limits: ApplicationConfig, intake: Arc<IntakeState>) -> Self {
        Self {
            limits,
            store: SessionStore::new(),
            intake,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.store
    }

    pub async fn handle(&self, sender: &Sender, room_id: &str, input: DialogInput) -> Step {
        let applicant_id = sender.user_id.as_str();

        if matches!(input, DialogInput::Start | DialogInput::Apply) && !self.intake.is_open() {
            let state = self
                .store
                .get(applicant_id)
                .await
                .map(|s| s.stage.state())
                .unwrap_or(SessionState::Idle);
            return Step {
                reply: Some(Reply::IntakeClosed),
                state,
                record: None,
            };
        }

        if input == DialogInput::Expire {
            return self.expire(applicant_id).await;
        }

        let outcome = self
            .store
            .with_session(applicant_id, room_id, |session| {
                let t = transition(&session.stage, &input, &self.limits);
                let state = t.state();
                let reply_room = room_id.to_string();
                match t.next {
                    Some(next) => {
                        session.stage = next;
                        session.reply_room = reply_room.clone();
                        session.last_activity = Instant::now();
                        (true, (t.reply, state, t.completed, reply_room))
                    }
                    None => (false, (t.reply, state, t.completed, reply_room)),
                }
            })
            .await;

        let (reply, state, completed, reply_room) = outcome;
        let record = completed.map(|fields| ApplicationRecord {
            applicant_id: applicant_id.to_string(),
            reply_room,
            display_name: sender.display_name.clone(),
            handle: sender.handle.clone(),
            experience: fields.experience,
            time_commitment_hours: fields.hours,
            motivation: fields.motivation,
            submitted_at: Utc::now(),
        });

        tracing::debug!("Session {} -> {:?}", applicant_id, state);
        Step {
            reply: Some(reply),
            state,
            record,
        }
    }

    /// Expire is re-validated here: activity since the sweep keeps the session.
    async fn expire(&self, applicant_id: &str) -> Step {
        let Some(timeout) = self.limits.session_timeout() else {
            return Step {
                reply: None,
                state: SessionState::Idle,
                record: None,
            };
        };
        match self.store.expire_if_idle(applicant_id, timeout).await {
            Ok(()) => Step {
                reply: Some(Reply::Expired),
                state: SessionState::Idle,
                record: None,
            },
            Err(current) => Step {
                reply: None,
                state: current,
                record: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limits() -> ApplicationConfig {
        ApplicationConfig::default()
    }

    fn engine() -> ConversationEngine {
        ConversationEngine::new(limits(), Arc::new(IntakeState::new(true)))
    }

    fn text(body: &str) -> DialogInput {
        DialogInput::Text(body.to_string())
    }

    #[test]
    fn test_hours_step_advances_only_on_valid_input() {
        let stage = Stage::AwaitingTimeCommitment {
            experience: "Yes".to_string(),
        };
        for ok in ["5", "24", "0,5", "12.75"] {
            let t = transition(&stage, &text(ok), &limits());
            assert_eq!(t.state(), SessionState::AwaitingMotivation, "input {ok}");
            assert_eq!(t.reply, Reply::AskMotivation);
        }
        for bad in ["0", "-3", "24.01", "five", "", "NaN"] {
            let t = transition(&stage, &text(bad), &limits());
            assert_eq!(t.next, Some(stage.clone()), "input {bad:?}");
            assert!(matches!(t.reply, Reply::InvalidHours(_)));
        }
    }

    #[test]
    fn test_cancel_from_every_active_stage_destroys() {
        let stages = [
            Stage::AwaitingExperience,
            Stage::AwaitingTimeCommitment {
                experience: "x".to_string(),
            },
            Stage::AwaitingMotivation {
                experience: "x".to_string(),
                hours: 3.0,
            },
        ];
        for stage in stages {
            let t = transition(&stage, &DialogInput::Cancel, &limits());
            assert_eq!(t.next, None);
            assert_eq!(t.reply, Reply::Cancelled);
            assert_eq!(t.state(), SessionState::Idle);
        }
    }

    #[test]
    fn test_free_text_is_truncated() {
        let mut small = limits();
        small.experience_max_chars = 4;
        small.motivation_max_chars = 3;

        let t = transition(&Stage::AwaitingExperience, &text("Plenty of it"), &small);
        assert_eq!(
            t.next,
            Some(Stage::AwaitingTimeCommitment {
                experience: "Plen".to_string()
            })
        );

        let stage = Stage::AwaitingMotivation {
            experience: "Plen".to_string(),
            hours: 2.0,
        };
        let t = transition(&stage, &text("Growth"), &small);
        assert_eq!(t.completed.unwrap().motivation, "Gro");
    }

    #[test]
    fn test_blank_answers_reprompt_without_advancing() {
        for blank in ["", "   ", " \t "] {
            let t = transition(&Stage::AwaitingExperience, &text(blank), &limits());
            assert_eq!(t.next, Some(Stage::AwaitingExperience), "input {blank:?}");
            assert_eq!(t.reply, Reply::EmptyAnswer(SessionState::AwaitingExperience));

            let stage = Stage::AwaitingMotivation {
                experience: "Yes".to_string(),
                hours: 5.0,
            };
            let t = transition(&stage, &text(blank), &limits());
            assert_eq!(t.next, Some(stage.clone()));
            assert_eq!(t.completed, None);
            assert_eq!(t.reply, Reply::EmptyAnswer(SessionState::AwaitingMotivation));
        }
    }

    #[tokio::test]
    async fn test_start_leaves_no_stored_session() {
        let engine = engine();
        for n in 0..10 {
            let sender = Sender::new(&format!("@visitor{n}:x"));
            let step = engine.handle(&sender, "!dm:x", DialogInput::Start).await;
            assert_eq!(step.reply, Some(Reply::Welcome));
        }
        assert_eq!(engine.sessions().len().await, 0);

        // Start in the middle of a dialog drops it as well.
        let ann = Sender::new("@ann:x");
        engine.handle(&ann, "!ann:x", DialogInput::Apply).await;
        engine.handle(&ann, "!ann:x", DialogInput::Start).await;
        assert!(engine.sessions().get("@ann:x").await.is_none());
    }

    #[test]
    fn test_idle_text_gets_hint() {
        let t = transition(&Stage::Idle, &text("hello"), &limits());
        assert_eq!(t.reply, Reply::IdleHint);
        assert_eq!(t.next, None);
    }

    #[tokio::test]
    async fn test_full_dialog_produces_record() {
        let engine = engine();
        let sender = Sender::new("@ann:example.org")
            .with_display_name("Ann")
            .with_handle("ann");
        let room = "!ann:example.org";

        let step = engine.handle(&sender, room, DialogInput::Start).await;
        assert_eq!(step.reply, Some(Reply::Welcome));
        assert_eq!(step.state, SessionState::Idle);

        let step = engine.handle(&sender, room, DialogInput::Apply).await;
        assert_eq!(step.state, SessionState::AwaitingExperience);

        engine.handle(&sender, room, text("Yes")).await;
        let step = engine.handle(&sender, room, text("5")).await;
        assert_eq!(step.state, SessionState::AwaitingMotivation);

        let step = engine.handle(&sender, room, text("Growth")).await;
        assert_eq!(step.state, SessionState::Completed);
        assert_eq!(step.reply, Some(Reply::Submitted));
        let record = step.record.unwrap();
        assert_eq!(record.experience, "Yes");
        assert_eq!(record.time_commitment_hours, 5.0);
        assert_eq!(record.motivation, "Growth");
        assert_eq!(record.display_name, "Ann");
        assert_eq!(record.handle.as_deref(), Some("ann"));
        assert_eq!(record.reply_room, room);
        assert!(engine.sessions().get("@ann:example.org").await.is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let engine = engine();
        let a = Sender::new("@a:x");
        let b = Sender::new("@b:x");
        engine.handle(&a, "!a:x", DialogInput::Apply).await;
        engine.handle(&b, "!b:x", DialogInput::Apply).await;
        engine.handle(&a, "!a:x", text("lots")).await;

        let sa = engine.sessions().get("@a:x").await.unwrap();
        let sb = engine.sessions().get("@b:x").await.unwrap();
        assert_eq!(sa.stage.state(), SessionState::AwaitingTimeCommitment);
        assert_eq!(sb.stage.state(), SessionState::AwaitingExperience);
    }

    #[tokio::test]
    async fn test_closed_intake_blocks_new_sessions_only() {
        let intake = Arc::new(IntakeState::new(true));
        let engine = ConversationEngine::new(limits(), intake.clone());
        let early = Sender::new("@early:x");
        engine.handle(&early, "!e:x", DialogInput::Apply).await;

        intake.set_open(false);
        let late = Sender::new("@late:x");
        let step = engine.handle(&late, "!l:x", DialogInput::Start).await;
        assert_eq!(step.reply, Some(Reply::IntakeClosed));
        assert!(engine.sessions().get("@late:x").await.is_none());

        let step = engine.handle(&early, "!e:x", text("some")).await;
        assert_eq!(step.state, SessionState::AwaitingTimeCommitment);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_is_revalidated() {
        let mut cfg = limits();
        cfg.session_timeout_minutes = Some(1);
        let engine = ConversationEngine::new(cfg, Arc::new(IntakeState::new(true)));
        let sender = Sender::new("@slow:x");
        engine.handle(&sender, "!s:x", DialogInput::Apply).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        // Activity after the sweep but before the expire event is processed.
        engine.handle(&sender, "!s:x", text("some")).await;
        let step = engine.handle(&sender, "!s:x", DialogInput::Expire).await;
        assert_eq!(step.reply, None);
        assert_eq!(step.state, SessionState::AwaitingTimeCommitment);

        tokio::time::advance(Duration::from_secs(61)).await;
        let step = engine.handle(&sender, "!s:x", DialogInput::Expire).await;
        assert_eq!(step.reply, Some(Reply::Expired));
        assert!(engine.sessions().get("@slow:x").await.is_none());
    }
}
