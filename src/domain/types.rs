//! # Domain Types
//!
//! Common data structures and enums used across the application logic.

use chrono::{DateTime, Utc};

/// Opaque, stable identifier of a chat user (a Matrix user id).
pub type UserId = String;

/// Identifier of a chat room the bot can write into.
pub type RoomId = String;

/// Who sent an inbound event, as far as the platform tells us.
#[derive(Debug, Clone, PartialEq)]
pub struct Sender {
    pub user_id: UserId,
    pub display_name: String,
    pub handle: Option<String>,
}

impl Sender {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: user_id.to_string(),
            handle: None,
        }
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = name.to_string();
        self
    }

    pub fn with_handle(mut self, handle: &str) -> Self {
        self.handle = Some(handle.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    Help,
    Pause,
    Resume,
    Status,
    /// Generated by the session sweeper, never typed by a user.
    Expire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Rejected,
}

/// Decoded action token (what a button press carries).
#[derive(Debug, Clone, PartialEq)]
pub enum ActionToken {
    Apply,
    Decide { verdict: Verdict, applicant_id: UserId },
}

impl ActionToken {
    pub fn encode(&self) -> String {
        match self {
            ActionToken::Apply => "apply".to_string(),
            ActionToken::Decide {
                verdict: Verdict::Approved,
                applicant_id,
            } => format!("approve_{applicant_id}"),
            ActionToken::Decide {
                verdict: Verdict::Rejected,
                applicant_id,
            } => format!("reject_{applicant_id}"),
        }
    }

    /// `accept_` is kept as an alias of `approve_` for older notifications.
    pub fn decode(token: &str) -> Option<Self> {
        if token == "apply" {
            return Some(ActionToken::Apply);
        }
        let (action, applicant_id) = token.split_once('_')?;
        if applicant_id.is_empty() {
            return None;
        }
        let verdict = match action {
            "approve" | "accept" => Verdict::Approved,
            "reject" => Verdict::Rejected,
            _ => return None,
        };
        Some(ActionToken::Decide {
            verdict,
            applicant_id: applicant_id.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundKind {
    Command(Command),
    Action(ActionToken),
    Text(String),
}

/// One event delivered by the pump.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub sender: Sender,
    /// Room the event arrived in; replies to the sender go here.
    pub room_id: RoomId,
    pub kind: InboundKind,
}

/// A button attached to an outbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub label: String,
    pub token: String,
}

impl Action {
    pub fn new(label: &str, token: &ActionToken) -> Self {
        Self {
            label: label.to_string(),
            token: token.encode(),
        }
    }
}

/// Reference to a message the bot sent, enough to edit it later.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub room_id: RoomId,
    pub event_id: String,
    /// Body without the actions footer.
    pub body: String,
}

impl SentMessage {
    pub fn with_footer(&self, footer: &str) -> Self {
        Self {
            room_id: self.room_id.clone(),
            event_id: self.event_id.clone(),
            body: format!("{}\n\n{}", self.body, footer),
        }
    }
}

/// Finalized, immutable application.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationRecord {
    pub applicant_id: UserId,
    pub reply_room: RoomId,
    pub display_name: String,
    pub handle: Option<String>,
    pub experience: String,
    pub time_commitment_hours: f64,
    pub motivation: String,
    pub submitted_at: DateTime<Utc>,
}
