//! # Wizard Strings
//!
//! Prompts shown to applicants while they fill in an application.

use crate::application::conversation::Reply;
use crate::application::state::SessionState;
use crate::domain::errors::ValidationError;
use crate::domain::types::{Action, ActionToken};

pub const WELCOME: &str = "🚀 **Hi!** This bot collects applications to join our team.";
pub const ASK_EXPERIENCE: &str = "💼 Do you have experience in this field? (Yes/No, or a short description)";
pub const ASK_HOURS: &str = "⏳ How many hours per day can you dedicate? (a number, e.g. `4` or `2,5`)";
pub const ASK_MOTIVATION: &str = "🎯 What do you want to get out of this work? (briefly)";
pub const SUBMITTED: &str = "✅ Application sent! Please wait for an answer.";
pub const CANCELLED: &str = "❌ Application cancelled.";
pub const EXPIRED: &str = "⌛ Your application timed out due to inactivity. Send `.start` to begin again.";
pub const IDLE_HINT: &str = "Send `.start` to submit an application.";
pub const INTAKE_CLOSED: &str = "⏸️ Applications are closed at the moment. Please try again later.";
pub const APPLY_LABEL: &str = "📝 Apply";

pub fn invalid_hours(err: &ValidationError, max_hours: f64) -> String {
    let reason = match err {
        ValidationError::NotANumber(_) => "that is not a number".to_string(),
        ValidationError::OutOfRange { .. } => format!("it must be more than 0 and at most {max_hours}"),
    };
    format!("⚠️ Please enter the hours as a number ({reason}).\n{ASK_HOURS}")
}

pub fn empty_answer(state: SessionState) -> String {
    let question = match state {
        SessionState::AwaitingMotivation => ASK_MOTIVATION,
        _ => ASK_EXPERIENCE,
    };
    format!("⚠️ The answer can't be empty.\n{question}")
}

pub fn reply_text(reply: &Reply, max_hours: f64) -> String {
    match reply {
        Reply::Welcome => WELCOME.to_string(),
        Reply::AskExperience => ASK_EXPERIENCE.to_string(),
        Reply::AskHours => ASK_HOURS.to_string(),
        Reply::InvalidHours(err) => invalid_hours(err, max_hours),
        Reply::EmptyAnswer(state) => empty_answer(*state),
        Reply::AskMotivation => ASK_MOTIVATION.to_string(),
        Reply::Submitted => SUBMITTED.to_string(),
        Reply::Cancelled => CANCELLED.to_string(),
        Reply::Expired => EXPIRED.to_string(),
        Reply::IdleHint => IDLE_HINT.to_string(),
        Reply::IntakeClosed => INTAKE_CLOSED.to_string(),
    }
}

/// Only the welcome message carries a button.
pub fn reply_actions(reply: &Reply) -> Vec<Action> {
    match reply {
        Reply::Welcome => vec![Action::new(APPLY_LABEL, &ActionToken::Apply)],
        _ => Vec::new(),
    }
}
