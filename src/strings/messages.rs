//! # Messages
//!
//! Contains constant strings and format functions for user-facing messages.
//! Includes review notifications, decision outcomes and acknowledgments.

use crate::domain::types::{ApplicationRecord, Verdict};
use crate::domain::validation::format_hours;

pub const AUTH_DENIED: &str = "🚫 **Authorization Denied**.";
pub const APPROVED: &str = "🎉 Your application has been approved! We will contact you soon.";
pub const REJECTED: &str = "😕 Your application has been rejected.";
pub const APPROVE_LABEL: &str = "✅ Approve";
pub const REJECT_LABEL: &str = "❌ Reject";
pub const SUPERSEDED: &str = "♻️ _Superseded by a newer application._";
pub const INTAKE_PAUSED: &str = "⏸️ Intake paused. New applications are refused.";
pub const INTAKE_RESUMED: &str = "▶️ Intake resumed.";
pub const INTAKE_UNCHANGED: &str = "Intake already in that state.";

pub fn application_notification(record: &ApplicationRecord) -> String {
    let handle = record
        .handle
        .as_deref()
        .map(|h| format!("@{h}"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "📌 **New application**\n\n\
         👤 **User:** {handle} (ID: `{id}`)\n\
         📝 **Name:** {name}\n\n\
         💼 **Experience:** {experience}\n\
         ⏳ **Hours per day:** {hours}\n\
         🎯 **Goal:** {motivation}",
        id = record.applicant_id,
        name = record.display_name,
        experience = record.experience,
        hours = format_hours(record.time_commitment_hours),
        motivation = record.motivation,
    )
}

pub fn verdict_for_applicant(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Approved => APPROVED,
        Verdict::Rejected => REJECTED,
    }
}

pub fn verdict_word(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Approved => "approved",
        Verdict::Rejected => "rejected",
    }
}

pub fn decision_footer(verdict: Verdict, reviewer: &str) -> String {
    format!("**Decision:** {} by {reviewer}", verdict_word(verdict))
}

pub fn decision_recorded(verdict: Verdict, applicant_id: &str) -> String {
    format!("Application of `{applicant_id}` {}.", verdict_word(verdict))
}

pub fn already_decided(verdict: Verdict, reviewer: &str) -> String {
    format!(
        "ℹ️ This application was already {} by {reviewer}.",
        verdict_word(verdict)
    )
}

pub fn no_pending_application(applicant_id: &str) -> String {
    format!("ℹ️ No pending application from `{applicant_id}`.")
}

pub fn status_report(intake_open: bool, sessions: usize, pending: usize) -> String {
    let intake = if intake_open { "open" } else { "paused" };
    format!(
        "**Intake**: {intake}\n**Sessions in progress**: {sessions}\n**Pending decisions**: {pending}"
    )
}
