//! # Wizard Command Handler
//!
//! Feeds applicant input (`.start`, `.apply`, `.cancel`, free text) through the
//! `ConversationEngine`, hands completed applications to the `ReviewRouter` and
//! answers the applicant.

use crate::application::conversation::{ConversationEngine, DialogInput};
use crate::application::review::ReviewRouter;
use crate::domain::traits::ChatProvider;
use crate::domain::types::InboundEvent;
use crate::strings::{logs, wizard};
use anyhow::Result;

pub async fn handle_step(
    engine: &ConversationEngine,
    review: &ReviewRouter,
    chat: &impl ChatProvider,
    event: &InboundEvent,
    input: DialogInput,
    max_hours: f64,
) -> Result<()> {
    let step = engine.handle(&event.sender, &event.room_id, input).await;

    if let Some(record) = step.record {
        let report = review.dispatch(chat, record).await;
        if report.delivered == 0 {
            tracing::error!(
                "Application of {} reached no reviewer",
                event.sender.user_id
            );
        }
    }

    if let Some(reply) = step.reply {
        let text = wizard::reply_text(&reply, max_hours);
        let actions = wizard::reply_actions(&reply);
        if let Err(e) = chat.send_message(&event.room_id, &text, &actions).await {
            tracing::error!(
                "{}",
                logs::applicant_delivery_failed(&event.sender.user_id, &e.to_string())
            );
        }
    }
    Ok(())
}
