//! # Admin Command
//!
//! Handles `.pause`, `.resume` and `.status`.
//! Only configured reviewers may use them.

use crate::application::review::ReviewRouter;
use crate::application::state::{IntakeState, SessionStore};
use crate::domain::traits::ChatProvider;
use crate::domain::types::{Command, InboundEvent};
use crate::strings::messages;
use anyhow::Result;

pub async fn handle_admin(
    intake: &IntakeState,
    sessions: &SessionStore,
    review: &ReviewRouter,
    chat: &impl ChatProvider,
    event: &InboundEvent,
    command: Command,
) -> Result<()> {
    // Check Permissions
    if !review.is_reviewer(&event.sender.user_id) {
        chat.send_notification(&event.room_id, messages::AUTH_DENIED).await?;
        return Ok(());
    }

    let reply = match command {
        Command::Pause | Command::Resume => {
            let open = command == Command::Resume;
            let was_open = intake.set_open(open);
            tracing::info!(
                "Intake set to {} by {}",
                if open { "open" } else { "paused" },
                event.sender.user_id
            );
            match (was_open == open, open) {
                (true, _) => messages::INTAKE_UNCHANGED.to_string(),
                (false, true) => messages::INTAKE_RESUMED.to_string(),
                (false, false) => messages::INTAKE_PAUSED.to_string(),
            }
        }
        _ => messages::status_report(
            intake.is_open(),
            sessions.len().await,
            review.pending_count().await,
        ),
    };
    chat.send_notification(&event.room_id, &reply).await?;
    Ok(())
}
