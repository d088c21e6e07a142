//! Matching worker: turns stored submissions into match envelopes.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use kinship_core::defaults::{
    EVENT_BUS_CAPACITY, MATCH_CHUNK_SIZE, MATCH_LIMIT, MATCH_MAX_CONCURRENT,
    MATCH_QUEUE_CAPACITY, MATCH_THRESHOLD,
};
use kinship_core::{
    Candidate, Error, MatchEnvelope, ProfileQuery, ProfileRepository, Result,
};
use kinship_match::MatchEngine;

use crate::fanout::rank_parallel;

/// Configuration for the matching worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Whether to process match requests at all.
    pub enabled: bool,
    /// Maximum matching runs in flight.
    pub max_concurrent: usize,
    /// Minimum final score for an envelope entry.
    pub threshold: f64,
    /// Maximum entries per envelope.
    pub limit: usize,
    /// Candidates per blocking scoring task.
    pub chunk_size: usize,
    /// Re-queue opted-in profiles without matches on startup.
    pub recover_pending: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent: MATCH_MAX_CONCURRENT,
            threshold: MATCH_THRESHOLD,
            limit: MATCH_LIMIT,
            chunk_size: MATCH_CHUNK_SIZE,
            recover_pending: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MATCH_WORKER_ENABLED` | `true` | Enable/disable matching |
    /// | `MATCH_MAX_CONCURRENT` | `4` | Max matching runs in flight |
    /// | `MATCH_THRESHOLD` | `60` | Minimum score for an envelope entry |
    /// | `MATCH_LIMIT` | `10` | Maximum envelope entries |
    /// | `MATCH_CHUNK_SIZE` | `64` | Candidates per scoring task |
    pub fn from_env() -> Self {
        let enabled = std::env::var("MATCH_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent = std::env::var("MATCH_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(MATCH_MAX_CONCURRENT)
            .max(1);

        let threshold = std::env::var("MATCH_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|t| (0.0..=100.0).contains(t))
            .unwrap_or(MATCH_THRESHOLD);

        let limit = std::env::var("MATCH_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(MATCH_LIMIT);

        let chunk_size = std::env::var("MATCH_CHUNK_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(MATCH_CHUNK_SIZE)
            .max(1);

        Self {
            enabled,
            max_concurrent,
            threshold,
            limit,
            chunk_size,
            recover_pending: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn with_recover_pending(mut self, recover: bool) -> Self {
        self.recover_pending = recover;
        self
    }
}

// =============================================================================
// QUEUE
// =============================================================================

/// Sending side of the match request queue.
///
/// Enqueueing never blocks: a full or closed queue is logged and the profile
/// simply stays pending until the next startup recovery sweep.
#[derive(Clone)]
pub struct MatchQueue {
    tx: mpsc::Sender<Uuid>,
}

/// Receiving side of the match request queue, consumed by [`MatchWorker::start`].
pub struct MatchQueueReceiver {
    pub(crate) rx: mpsc::Receiver<Uuid>,
}

impl MatchQueue {
    pub fn channel(capacity: usize) -> (MatchQueue, MatchQueueReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (MatchQueue { tx }, MatchQueueReceiver { rx })
    }

    pub fn with_default_capacity() -> (MatchQueue, MatchQueueReceiver) {
        Self::channel(MATCH_QUEUE_CAPACITY)
    }

    /// Request a matching run; returns whether the request was accepted.
    pub fn enqueue(&self, profile_id: Uuid) -> bool {
        match self.tx.try_send(profile_id) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    subsystem = "jobs",
                    component = "queue",
                    %profile_id,
                    "Match queue full, profile stays pending"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(
                    subsystem = "jobs",
                    component = "queue",
                    %profile_id,
                    "Match worker not running, profile stays pending"
                );
                false
            }
        }
    }
}

// =============================================================================
// EVENTS & HANDLE
// =============================================================================

/// Event emitted by the matching worker.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    WorkerStarted,
    MatchStarted {
        profile_id: Uuid,
    },
    MatchCompleted {
        profile_id: Uuid,
        above_threshold: usize,
        total_evaluated: usize,
    },
    MatchFailed {
        profile_id: Uuid,
        error: String,
    },
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down after the batch in flight.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

// =============================================================================
// WORKER
// =============================================================================

/// Consumes match requests and attaches envelopes to stored profiles.
#[derive(Clone)]
pub struct MatchWorker {
    repo: Arc<dyn ProfileRepository>,
    engine: MatchEngine,
    config: WorkerConfig,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl MatchWorker {
    pub fn new(repo: Arc<dyn ProfileRepository>, engine: MatchEngine, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            repo,
            engine,
            config,
            event_tx,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Run one matching pass for `profile_id` and store the envelope.
    ///
    /// The pool is every opted-in profile at the time of the query; the
    /// subject itself is excluded by the ranker.
    #[instrument(
        skip(self),
        fields(subsystem = "jobs", component = "match_worker", op = "process")
    )]
    pub async fn process(&self, profile_id: Uuid) -> Result<MatchEnvelope> {
        let start = Instant::now();
        let record = self.repo.get_by_id(profile_id).await?;
        let subject = record.to_subject()?;

        let pool: Arc<[Candidate]> = self
            .repo
            .query_by_flags(ProfileQuery::candidate_pool())
            .await?
            .iter()
            .map(Candidate::from)
            .collect();

        let envelope = rank_parallel(
            &self.engine,
            subject,
            pool,
            self.config.threshold,
            self.config.limit,
            self.config.chunk_size,
        )
        .await?;

        self.repo
            .attach_matches(profile_id, envelope.clone())
            .await?;

        info!(
            %profile_id,
            above_threshold = envelope.above_threshold,
            total_evaluated = envelope.total_evaluated,
            duration_ms = start.elapsed().as_millis() as u64,
            "Matches attached"
        );
        Ok(envelope)
    }

    async fn execute(self, profile_id: Uuid) {
        let _ = self.event_tx.send(WorkerEvent::MatchStarted { profile_id });
        match self.process(profile_id).await {
            Ok(envelope) => {
                let _ = self.event_tx.send(WorkerEvent::MatchCompleted {
                    profile_id,
                    above_threshold: envelope.above_threshold,
                    total_evaluated: envelope.total_evaluated,
                });
            }
            Err(e) => {
                warn!(
                    subsystem = "jobs",
                    component = "match_worker",
                    %profile_id,
                    error = %e,
                    persistence = e.is_persistence(),
                    "Matching run failed"
                );
                let _ = self.event_tx.send(WorkerEvent::MatchFailed {
                    profile_id,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Opted-in profiles that never received an envelope.
    async fn pending_ids(&self) -> Vec<Uuid> {
        match self
            .repo
            .query_by_flags(ProfileQuery::pending_matches())
            .await
        {
            Ok(records) => records.into_iter().map(|r| r.id).collect(),
            Err(e) => {
                error!(error = %e, "Failed to load pending profiles");
                Vec::new()
            }
        }
    }

    /// Start the worker and return a handle for control.
    pub fn start(self, queue: MatchQueueReceiver) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(queue.rx, shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    async fn run_batch(&self, batch: Vec<Uuid>) {
        debug!(batch = batch.len(), "Processing match batch");
        let mut tasks = JoinSet::new();
        for profile_id in batch {
            tasks.spawn(self.clone().execute(profile_id));
        }
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = ?e, "Matching task panicked");
            }
        }
    }

    /// Worker loop: take up to `max_concurrent` requests at a time, run them
    /// concurrently, repeat until shutdown or until every queue sender is gone.
    #[instrument(skip_all, fields(subsystem = "jobs", component = "match_worker"))]
    async fn run(&self, mut queue: mpsc::Receiver<Uuid>, mut shutdown_rx: mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Match worker is disabled, not starting");
            return;
        }

        info!(
            max_concurrent = self.config.max_concurrent,
            threshold = self.config.threshold,
            limit = self.config.limit,
            algorithm_version = self.engine.version(),
            "Match worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        if self.config.recover_pending {
            let pending = self.pending_ids().await;
            if !pending.is_empty() {
                info!(count = pending.len(), "Recovering pending match requests");
            }
            for batch in pending.chunks(self.config.max_concurrent) {
                if shutdown_rx.try_recv().is_ok() {
                    info!("Match worker received shutdown signal");
                    let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
                    return;
                }
                self.run_batch(batch.to_vec()).await;
            }
        }

        loop {
            let first = tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Match worker received shutdown signal");
                    break;
                }
                next = queue.recv() => match next {
                    Some(id) => id,
                    None => {
                        info!("Match queue closed");
                        break;
                    }
                },
            };

            let mut batch = vec![first];
            while batch.len() < self.config.max_concurrent {
                match queue.try_recv() {
                    Ok(id) => batch.push(id),
                    Err(_) => break,
                }
            }
            self.run_batch(batch).await;
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Match worker stopped");
    }
}
