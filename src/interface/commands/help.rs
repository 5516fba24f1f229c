//! # Help Command
//!
//! Handles the `.help` command.
//! Reviewers additionally see their own commands.

use crate::domain::traits::ChatProvider;
use crate::domain::types::InboundEvent;
use anyhow::Result;

pub async fn handle_help(chat: &impl ChatProvider, event: &InboundEvent, is_reviewer: bool) -> Result<()> {
    let mut text = crate::strings::help::APPLICANT.to_string();
    if is_reviewer {
        text.push_str(crate::strings::help::REVIEWER);
    }
    chat.send_notification(&event.room_id, &text).await?;
    Ok(())
}
