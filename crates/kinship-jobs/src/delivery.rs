//! Result delivery: polling a submitted profile until its matches land.
//!
//! Matching runs asynchronously after a submission is stored, so the
//! submitter's side reads the profile back until the match envelope appears.
//! The transitions are a pure function ([`DeliveryState::advance`]) driven by
//! the async [`MatchPoller`]:
//!
//! ```text
//! Submitted ─► PendingMatch{0} ─read─► PendingMatch{n} ─read─► Matched(envelope)
//!                                          │
//!                                          ├─ n = max_attempts ─► TimedOut{n}
//!                                          ├─ store error ──────► Degraded{error}
//!                                          └─ cancel ───────────► Cancelled{n}
//! ```
//!
//! Timing out is an outcome, not an error: the caller tells the user to check
//! back later. Only a complete stored envelope ever yields `Matched`.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `KINSHIP_POLL_INTERVAL_MS` | `3000` | Delay between two reads |
//! | `KINSHIP_POLL_MAX_ATTEMPTS` | `20` | Reads before timing out |

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use kinship_core::defaults::{POLL_INTERVAL_MS, POLL_MAX_ATTEMPTS};
use kinship_core::{MatchEnvelope, ProfileRepository};

/// Polling cadence and ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval_ms: u64,
    /// Number of reads before giving up; always at least 1.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: POLL_INTERVAL_MS,
            max_attempts: POLL_MAX_ATTEMPTS,
        }
    }
}

impl PollConfig {
    pub fn from_env() -> Self {
        let interval_ms = std::env::var("KINSHIP_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(POLL_INTERVAL_MS);
        let max_attempts = std::env::var("KINSHIP_POLL_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(POLL_MAX_ATTEMPTS)
            .max(1);
        Self {
            interval_ms,
            max_attempts,
        }
    }

    pub fn with_interval_ms(mut self, ms: u64) -> Self {
        self.interval_ms = ms;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// What one read of the subject record found.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// The record carries a complete envelope.
    Envelope(MatchEnvelope),
    /// The record exists but has no envelope yet.
    Absent,
    /// The store could not be read.
    Failed(String),
    /// The caller asked to stop waiting.
    Cancelled,
}

/// Where a submission is in the delivery protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeliveryState {
    Submitted,
    PendingMatch { attempts: u32 },
    Matched(MatchEnvelope),
    TimedOut { attempts: u32 },
    Degraded { error: String },
    Cancelled { attempts: u32 },
}

impl DeliveryState {
    /// Apply one observation.
    ///
    /// Terminal states absorb every further observation. A read counts as an
    /// attempt whatever it finds; a cancellation does not.
    pub fn advance(self, observation: Observation, config: &PollConfig) -> DeliveryState {
        let attempts = match self {
            DeliveryState::Submitted => 0,
            DeliveryState::PendingMatch { attempts } => attempts,
            terminal => return terminal,
        };
        match observation {
            Observation::Envelope(envelope) => DeliveryState::Matched(envelope),
            Observation::Absent => {
                let attempts = attempts.saturating_add(1);
                if attempts >= config.max_attempts {
                    DeliveryState::TimedOut { attempts }
                } else {
                    DeliveryState::PendingMatch { attempts }
                }
            }
            Observation::Failed(error) => DeliveryState::Degraded { error },
            Observation::Cancelled => DeliveryState::Cancelled { attempts },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            DeliveryState::Submitted | DeliveryState::PendingMatch { .. }
        )
    }

    /// Stable lowercase name, as used on the wire.
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryState::Submitted => "submitted",
            DeliveryState::PendingMatch { .. } => "pending_match",
            DeliveryState::Matched(_) => "matched",
            DeliveryState::TimedOut { .. } => "timed_out",
            DeliveryState::Degraded { .. } => "degraded",
            DeliveryState::Cancelled { .. } => "cancelled",
        }
    }
}

/// Drives [`DeliveryState`] against a profile store.
#[derive(Clone)]
pub struct MatchPoller {
    repo: Arc<dyn ProfileRepository>,
    config: PollConfig,
}

impl MatchPoller {
    pub fn new(repo: Arc<dyn ProfileRepository>, config: PollConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    async fn observe(&self, id: Uuid) -> Observation {
        match self.repo.get_by_id(id).await {
            Ok(record) => match record.matches {
                Some(envelope) => Observation::Envelope(envelope),
                None => Observation::Absent,
            },
            Err(e) => {
                warn!(
                    subsystem = "jobs",
                    component = "poller",
                    profile_id = %id,
                    error = %e,
                    "Profile read failed while waiting for matches"
                );
                Observation::Failed(e.to_string())
            }
        }
    }

    /// Read the profile until its envelope appears, the attempt ceiling is
    /// reached, a read fails, or a message arrives on `cancel`.
    ///
    /// The first read happens immediately; reads are then spaced by the poll
    /// interval. Dropping every sender of `cancel` simply removes the option
    /// to cancel.
    #[instrument(
        skip(self, cancel),
        fields(subsystem = "jobs", component = "poller", op = "wait_for_matches")
    )]
    pub async fn wait_for_matches(
        &self,
        id: Uuid,
        mut cancel: mpsc::Receiver<()>,
    ) -> DeliveryState {
        let mut state = DeliveryState::PendingMatch { attempts: 0 };
        let mut cancellable = true;

        loop {
            if cancellable && cancel.try_recv().is_ok() {
                state = state.advance(Observation::Cancelled, &self.config);
                break;
            }

            let observation = self.observe(id).await;
            state = state.advance(observation, &self.config);
            if state.is_terminal() {
                break;
            }
            debug!(profile_id = %id, state = state.label(), "Matches not ready yet");

            if cancellable {
                tokio::select! {
                    msg = cancel.recv() => {
                        match msg {
                            Some(()) => {
                                state = state.advance(Observation::Cancelled, &self.config);
                                break;
                            }
                            None => {
                                cancellable = false;
                                sleep(self.config.interval()).await;
                            }
                        }
                    }
                    _ = sleep(self.config.interval()) => {}
                }
            } else {
                sleep(self.config.interval()).await;
            }
        }

        info!(profile_id = %id, state = state.label(), "Match delivery finished");
        state
    }
}
