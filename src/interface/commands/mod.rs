//! # Command Handlers
//!
//! Parses inbound text into commands, action tokens or free text, and contains
//! the handler functions invoked by the Router.

pub mod admin;
pub mod decision;
pub mod help;
pub mod wizard;

use crate::domain::types::{ActionToken, Command, InboundKind};

/// Classifies a message body. `.`-prefixed words are commands or action tokens;
/// anything unrecognized is free text.
pub fn parse_inbound(body: &str) -> InboundKind {
    let msg = body.trim();
    let Some(rest) = msg.strip_prefix('.') else {
        return InboundKind::Text(msg.to_string());
    };
    let word = rest.split_whitespace().next().unwrap_or("");

    let command = match word {
        "start" => Some(Command::Start),
        "cancel" => Some(Command::Cancel),
        "help" => Some(Command::Help),
        "pause" => Some(Command::Pause),
        "resume" => Some(Command::Resume),
        "status" => Some(Command::Status),
        _ => None,
    };
    if let Some(command) = command {
        return InboundKind::Command(command);
    }
    match ActionToken::decode(word) {
        Some(token) => InboundKind::Action(token),
        None => InboundKind::Text(msg.to_string()),
    }
}
