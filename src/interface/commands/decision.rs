//! # Decision Command
//!
//! Handles `.approve_<id>` / `.reject_<id>` from reviewers.
//! The outcome is acknowledged to the acting reviewer only.

use crate::application::review::{Resolution, ReviewRouter};
use crate::domain::traits::ChatProvider;
use crate::domain::types::{InboundEvent, Verdict};
use crate::strings::messages;
use anyhow::Result;

pub async fn handle_decision(
    review: &ReviewRouter,
    chat: &impl ChatProvider,
    event: &InboundEvent,
    verdict: Verdict,
    applicant_id: &str,
) -> Result<()> {
    let resolution = review
        .resolve(chat, &event.sender.user_id, verdict, applicant_id)
        .await;

    let ack = match resolution {
        Resolution::Unauthorized => messages::AUTH_DENIED.to_string(),
        Resolution::Unknown => messages::no_pending_application(applicant_id),
        Resolution::AlreadyResolved { verdict, by } => messages::already_decided(verdict, &by),
        Resolution::Resolved { verdict } => messages::decision_recorded(verdict, applicant_id),
    };
    chat.send_notification(&event.room_id, &ack).await?;
    Ok(())
}
