//! # Review Router
//!
//! Fans a completed application out to every reviewer and correlates the
//! reviewers' decisions back to the applicant.
//!
//! The pending map is the only shared mutable state: resolution is a
//! check-and-set under its lock, and all network I/O happens after the lock is
//! released. The first decision wins; later ones are acknowledged to the
//! reviewer but never reach the applicant.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use crate::domain::config::ReviewerConfig;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{
    Action, ActionToken, ApplicationRecord, RoomId, SentMessage, UserId, Verdict,
};
use crate::strings::{logs, messages};

#[derive(Debug, Clone)]
pub struct PendingDecision {
    pub applicant_id: UserId,
    pub applicant_room: RoomId,
    pub issued_at: DateTime<Utc>,
    /// Distinguishes successive applications of the same applicant.
    pub generation: u64,
    /// First verdict and the reviewer who gave it.
    pub resolution: Option<(Verdict, UserId)>,
    /// Reviewer notifications still carrying actions.
    pub copies: Vec<SentMessage>,
}

impl PendingDecision {
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchReport {
    pub delivered: usize,
    /// Reviewers that could not be reached.
    pub failed: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Unauthorized,
    /// No application from this applicant was dispatched.
    Unknown,
    AlreadyResolved { verdict: Verdict, by: UserId },
    Resolved { verdict: Verdict },
}

enum Claim {
    Unknown,
    Taken(Verdict, UserId),
    Won { applicant_room: RoomId, copies: Vec<SentMessage> },
}

pub struct ReviewRouter {
    reviewers: Vec<ReviewerConfig>,
    pending: Mutex<HashMap<UserId, PendingDecision>>,
    generation: AtomicU64,
}

impl ReviewRouter {
    pub fn new(reviewers: Vec<ReviewerConfig>) -> Self {
        Self {
            reviewers,
            pending: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn is_reviewer(&self, user_id: &str) -> bool {
        self.reviewers
            .iter()
            .any(|r| r.user_id.to_lowercase() == user_id.to_lowercase())
    }

    pub async fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .await
            .values()
            .filter(|p| !p.is_resolved())
            .count()
    }

    pub async fn pending(&self, applicant_id: &str) -> Option<PendingDecision> {
        self.pending.lock().await.get(applicant_id).cloned()
    }

    /// Sends the application to every reviewer and registers the pending decision.
    /// A previous unresolved application of the same applicant is replaced.
    pub async fn dispatch<C: ChatProvider + ?Sized>(
        &self,
        chat: &C,
        record: ApplicationRecord,
    ) -> DispatchReport {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let applicant_id = record.applicant_id.clone();

        let superseded = {
            let mut guard = self.pending.lock().await;
            let previous = guard.insert(
                applicant_id.clone(),
                PendingDecision {
                    applicant_id: applicant_id.clone(),
                    applicant_room: record.reply_room.clone(),
                    issued_at: record.submitted_at,
                    generation,
                    resolution: None,
                    copies: Vec::new(),
                },
            );
            previous
                .filter(|p| !p.is_resolved())
                .map(|p| p.copies)
                .unwrap_or_default()
        };
        if !superseded.is_empty() {
            tracing::info!("Application of {} superseded by a new one", applicant_id);
            strip_actions(chat, &superseded, messages::SUPERSEDED).await;
        }

        let body = messages::application_notification(&record);
        let actions = decision_actions(&applicant_id);
        let sends = self.reviewers.iter().map(|reviewer| {
            let body = &body;
            let actions = &actions;
            async move {
                (
                    reviewer,
                    chat.send_message(&reviewer.room_id, body, actions).await,
                )
            }
        });

        let mut report = DispatchReport::default();
        let mut copies = Vec::new();
        for (reviewer, result) in join_all(sends).await {
            match result {
                Ok(message) => {
                    report.delivered += 1;
                    copies.push(message);
                }
                Err(e) => {
                    tracing::error!(
                        "{}",
                        logs::reviewer_delivery_failed(&reviewer.user_id, &e.to_string())
                    );
                    report.failed.push(reviewer.user_id.clone());
                }
            }
        }

        // A decision or a newer application may have landed while sending.
        let stale_footer = {
            let mut guard = self.pending.lock().await;
            match guard.get_mut(&applicant_id) {
                Some(p) if p.generation == generation => match &p.resolution {
                    None => {
                        p.copies.extend(copies.iter().cloned());
                        None
                    }
                    Some((verdict, by)) => Some(messages::decision_footer(*verdict, by)),
                },
                _ => Some(messages::SUPERSEDED.to_string()),
            }
        };
        if let Some(footer) = stale_footer {
            strip_actions(chat, &copies, &footer).await;
        }

        tracing::info!(
            "Application of {} sent to {}/{} reviewers",
            applicant_id,
            report.delivered,
            self.reviewers.len()
        );
        report
    }

    /// Applies a reviewer decision. Only the first decision per application
    /// notifies the applicant.
    pub async fn resolve<C: ChatProvider + ?Sized>(
        &self,
        chat: &C,
        reviewer: &str,
        verdict: Verdict,
        applicant_id: &str,
    ) -> Resolution {
        if !self.is_reviewer(reviewer) {
            tracing::warn!("Decision from non-reviewer {} ignored", reviewer);
            return Resolution::Unauthorized;
        }

        let claim = {
            let mut guard = self.pending.lock().await;
            match guard.get_mut(applicant_id) {
                None => Claim::Unknown,
                Some(p) => match &p.resolution {
                    Some((v, by)) => Claim::Taken(*v, by.clone()),
                    None => {
                        p.resolution = Some((verdict, reviewer.to_string()));
                        Claim::Won {
                            applicant_room: p.applicant_room.clone(),
                            copies: std::mem::take(&mut p.copies),
                        }
                    }
                },
            }
        };

        match claim {
            Claim::Unknown => Resolution::Unknown,
            Claim::Taken(verdict, by) => Resolution::AlreadyResolved { verdict, by },
            Claim::Won {
                applicant_room,
                copies,
            } => {
                tracing::info!(
                    "Application of {} {} by {}",
                    applicant_id,
                    messages::verdict_word(verdict),
                    reviewer
                );
                if let Err(e) = chat
                    .send_notification(&applicant_room, messages::verdict_for_applicant(verdict))
                    .await
                {
                    tracing::error!(
                        "{}",
                        logs::applicant_delivery_failed(applicant_id, &e.to_string())
                    );
                }
                strip_actions(chat, &copies, &messages::decision_footer(verdict, reviewer)).await;
                Resolution::Resolved { verdict }
            }
        }
    }
}

fn decision_actions(applicant_id: &str) -> Vec<Action> {
    vec![
        Action::new(
            messages::APPROVE_LABEL,
            &ActionToken::Decide {
                verdict: Verdict::Approved,
                applicant_id: applicant_id.to_string(),
            },
        ),
        Action::new(
            messages::REJECT_LABEL,
            &ActionToken::Decide {
                verdict: Verdict::Rejected,
                applicant_id: applicant_id.to_string(),
            },
        ),
    ]
}

/// Best effort: each failed copy is logged on its own.
async fn strip_actions<C: ChatProvider + ?Sized>(chat: &C, copies: &[SentMessage], footer: &str) {
    let edits = copies.iter().map(|copy| async move {
        let annotated = copy.with_footer(footer);
        (copy, chat.edit_actions(&annotated, &[]).await)
    });
    for (copy, result) in join_all(edits).await {
        if let Err(e) = result {
            tracing::warn!("{}", logs::copy_edit_failed(&copy.room_id, &e.to_string()));
        }
    }
}
