//! # Bot State
//!
//! In-memory state of the application: per-applicant dialog sessions (`SessionStore`)
//! and the process-wide intake flag (`IntakeState`).
//! Nothing here is persisted; a restart starts from empty sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::types::{RoomId, UserId};

/// Externally visible dialog state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingExperience,
    AwaitingTimeCommitment,
    AwaitingMotivation,
    Completed,
}

/// Dialog position together with the answers collected so far.
/// Each variant carries exactly the fields of the steps already passed.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Idle,
    AwaitingExperience,
    AwaitingTimeCommitment { experience: String },
    AwaitingMotivation { experience: String, hours: f64 },
}

impl Stage {
    pub fn state(&self) -> SessionState {
        match self {
            Stage::Idle => SessionState::Idle,
            Stage::AwaitingExperience => SessionState::AwaitingExperience,
            Stage::AwaitingTimeCommitment { .. } => SessionState::AwaitingTimeCommitment,
            Stage::AwaitingMotivation { .. } => SessionState::AwaitingMotivation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApplicantSession {
    pub applicant_id: UserId,
    pub reply_room: RoomId,
    pub stage: Stage,
    pub last_activity: Instant,
}

impl ApplicantSession {
    pub fn new(applicant_id: &str, reply_room: &str) -> Self {
        Self {
            applicant_id: applicant_id.to_string(),
            reply_room: reply_room.to_string(),
            stage: Stage::Idle,
            last_activity: Instant::now(),
        }
    }

    pub fn is_idle_for(&self, timeout: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_activity) >= timeout
    }
}

/// Session store keyed by applicant id. The map is only reachable through
/// `with_session` and the read helpers, so every change happens under the lock.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, ApplicantSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` on the applicant's session (created if absent) under the store
    /// lock. `f` returns `false` to delete the session afterwards.
    pub async fn with_session<R>(
        &self,
        applicant_id: &str,
        reply_room: &str,
        f: impl FnOnce(&mut ApplicantSession) -> (bool, R),
    ) -> R {
        let mut guard = self.sessions.lock().await;
        let session = guard
            .entry(applicant_id.to_string())
            .or_insert_with(|| ApplicantSession::new(applicant_id, reply_room));
        let (keep, result) = f(session);
        if !keep {
            guard.remove(applicant_id);
        }
        result
    }

    pub async fn get(&self, applicant_id: &str) -> Option<ApplicantSession> {
        self.sessions.lock().await.get(applicant_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Removes the session only if it has been idle for `timeout`. Otherwise
    /// returns the state it is in (`Idle` when there is none).
    pub async fn expire_if_idle(
        &self,
        applicant_id: &str,
        timeout: Duration,
    ) -> Result<(), SessionState> {
        let mut guard = self.sessions.lock().await;
        let session = guard.get(applicant_id).ok_or(SessionState::Idle)?;
        if !session.is_idle_for(timeout, Instant::now()) {
            return Err(session.stage.state());
        }
        guard.remove(applicant_id);
        Ok(())
    }

    /// Sessions with no activity for at least `timeout`, as `(applicant, room)`.
    pub async fn expired(&self, timeout: Duration) -> Vec<(UserId, RoomId)> {
        let now = Instant::now();
        self.sessions
            .lock()
            .await
            .values()
            .filter(|s| s.is_idle_for(timeout, now))
            .map(|s| (s.applicant_id.clone(), s.reply_room.clone()))
            .collect()
    }
}

/// Whether new applications are admitted.
///
/// Initialized from `application.intake_open` at startup and closed during
/// shutdown before the connection is torn down. Reviewers flip it with
/// `.pause` / `.resume`.
#[derive(Debug)]
pub struct IntakeState {
    open: AtomicBool,
}

impl IntakeState {
    pub fn new(open: bool) -> Self {
        Self {
            open: AtomicBool::new(open),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Returns the previous value.
    pub fn set_open(&self, open: bool) -> bool {
        self.open.swap(open, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_session_creates_and_deletes() {
        let store = SessionStore::new();
        let state = store
            .with_session("@a:x", "!a:x", |s| {
                s.stage = Stage::AwaitingExperience;
                (true, s.stage.state())
            })
            .await;
        assert_eq!(state, SessionState::AwaitingExperience);
        assert_eq!(store.len().await, 1);

        store.with_session("@a:x", "!a:x", |_| (false, ())).await;
        assert!(store.get("@a:x").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_reports_idle_sessions() {
        let store = SessionStore::new();
        store.with_session("@old:x", "!old:x", |_| (true, ())).await;
        tokio::time::advance(Duration::from_secs(120)).await;
        store.with_session("@new:x", "!new:x", |_| (true, ())).await;

        let expired = store.expired(Duration::from_secs(60)).await;
        assert_eq!(expired, vec![("@old:x".to_string(), "!old:x".to_string())]);
    }

    #[test]
    fn test_intake_swap() {
        let intake = IntakeState::new(true);
        assert!(intake.set_open(false));
        assert!(!intake.is_open());
    }
}
