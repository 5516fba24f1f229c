//! Connection supervisor.
//!
//! Keeps the event pump alive across transient failures:
//! - Opens the connection, runs the pump, and always closes the connection again
//! - Waits a cool-down after a duplicate-instance conflict, a backoff after other failures
//! - Gives up once `max_restarts` restarts have been spent
//! - Stops cleanly, without restarting, when the stop signal fires
//!
//! The supervisor is generic over `Transport` and knows nothing about what the
//! pump does with the events.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

use crate::domain::config::SupervisorConfig;
use crate::domain::errors::TransportError;
use crate::domain::traits::Transport;
use crate::strings::logs;

#[derive(Debug, Clone, PartialEq)]
pub struct RestartPolicy {
    pub max_restarts: u32,
    pub backoff: Duration,
    pub conflict_cooldown: Duration,
}

impl From<&SupervisorConfig> for RestartPolicy {
    fn from(config: &SupervisorConfig) -> Self {
        Self {
            max_restarts: config.max_restarts,
            backoff: Duration::from_secs(config.backoff_secs),
            conflict_cooldown: Duration::from_secs(config.conflict_cooldown_secs),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SupervisorState {
    pub restart_count: u32,
    pub max_restarts: u32,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorExit {
    /// The stop signal fired.
    Stopped,
    /// The restart budget ran out; carries the last error.
    BudgetExhausted(TransportError),
}

enum PumpExit {
    Stopped,
    Failed(TransportError),
}

pub struct ResilienceSupervisor<T: Transport> {
    transport: T,
    policy: RestartPolicy,
    state: SupervisorState,
}

impl<T: Transport> ResilienceSupervisor<T> {
    pub fn new(transport: T, policy: RestartPolicy) -> Self {
        let state = SupervisorState {
            restart_count: 0,
            max_restarts: policy.max_restarts,
            running: false,
        };
        Self {
            transport,
            policy,
            state,
        }
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    pub async fn run(&mut self, mut stop: watch::Receiver<bool>) -> SupervisorExit {
        loop {
            if *stop.borrow() {
                return SupervisorExit::Stopped;
            }

            let error = match self.run_once(&mut stop).await {
                PumpExit::Stopped => return SupervisorExit::Stopped,
                PumpExit::Failed(e) => e,
            };

            match &error {
                TransportError::Conflict(reason) => {
                    tracing::warn!(
                        "{}",
                        logs::conflict(
                            self.state.restart_count + 1,
                            self.policy.max_restarts,
                            self.policy.conflict_cooldown.as_secs(),
                            reason
                        )
                    );
                    if self.wait(self.policy.conflict_cooldown, &mut stop).await {
                        return SupervisorExit::Stopped;
                    }
                    self.state.restart_count += 1;
                    if self.budget_spent() {
                        return self.exhausted(error.clone());
                    }
                }
                TransportError::Failed(reason) => {
                    self.state.restart_count += 1;
                    tracing::error!(
                        "{}",
                        logs::pump_failed(
                            self.state.restart_count,
                            self.policy.max_restarts,
                            reason
                        )
                    );
                    if self.budget_spent() {
                        return self.exhausted(error.clone());
                    }
                    if self.wait(self.policy.backoff, &mut stop).await {
                        return SupervisorExit::Stopped;
                    }
                }
            }
        }
    }

    /// One open / run / close cycle. `close` runs on every path after a
    /// successful `open`, including a stop request and a panicking pump.
    async fn run_once(&mut self, stop: &mut watch::Receiver<bool>) -> PumpExit {
        let connection = match self.transport.open().await {
            Ok(c) => c,
            Err(e) => return PumpExit::Failed(e),
        };

        self.state.running = true;
        tracing::info!("{}", logs::SYNC_LOOP_START);
        let pump = AssertUnwindSafe(self.transport.run(&connection)).catch_unwind();
        let exit = tokio::select! {
            result = pump => match result {
                Ok(Ok(())) => PumpExit::Failed(TransportError::Failed(
                    "event stream ended".to_string(),
                )),
                Ok(Err(e)) => PumpExit::Failed(e),
                Err(_) => PumpExit::Failed(TransportError::Failed("event pump panicked".to_string())),
            },
            _ = wait_for_stop(stop) => PumpExit::Stopped,
        };

        self.transport.close(connection).await;
        self.state.running = false;
        exit
    }

    fn budget_spent(&self) -> bool {
        self.state.restart_count >= self.policy.max_restarts
    }

    fn exhausted(&self, error: TransportError) -> SupervisorExit {
        tracing::error!("{}", logs::restart_budget_exhausted(self.policy.max_restarts));
        SupervisorExit::BudgetExhausted(error)
    }

    /// Returns `true` when interrupted by the stop signal.
    async fn wait(&self, duration: Duration, stop: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = sleep(duration) => false,
            _ = wait_for_stop(stop) => true,
        }
    }
}

async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    let stopped = stop.wait_for(|stopped| *stopped).await.is_ok();
    if !stopped {
        // A dropped sender never stops the supervisor.
        futures::future::pending::<()>().await;
    }
}
