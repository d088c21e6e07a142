//! Parallel pool scoring.
//!
//! Scoring is CPU-bound, so the pool is cut into fixed-size chunks and each
//! chunk is scored on the blocking thread pool. The chunk results are merged
//! by the same [`assemble`] step the sequential ranker uses, which sorts the
//! whole set, so the envelope does not depend on chunk completion order.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::debug;

use kinship_core::{Candidate, Error, MatchEnvelope, MatchSubject, Result};
use kinship_match::{assemble, score_candidates, MatchEngine};

/// Rank `pool` against `subject` using one blocking task per chunk.
pub async fn rank_parallel(
    engine: &MatchEngine,
    subject: MatchSubject,
    pool: Arc<[Candidate]>,
    threshold: f64,
    limit: usize,
    chunk_size: usize,
) -> Result<MatchEnvelope> {
    let start = Instant::now();
    let chunk_size = chunk_size.max(1);
    let subject = Arc::new(subject);
    let mut tasks = JoinSet::new();

    for offset in (0..pool.len()).step_by(chunk_size) {
        let end = (offset + chunk_size).min(pool.len());
        let engine = engine.clone();
        let subject = Arc::clone(&subject);
        let pool = Arc::clone(&pool);
        tasks.spawn_blocking(move || score_candidates(engine.config(), &subject, &pool[offset..end]));
    }

    let chunks = tasks.len();
    let mut entries = Vec::with_capacity(pool.len());
    while let Some(result) = tasks.join_next().await {
        let scored = result.map_err(|e| Error::Internal(format!("scoring task failed: {}", e)))?;
        entries.extend(scored);
    }

    debug!(
        subsystem = "jobs",
        component = "fanout",
        op = "rank_parallel",
        profile_id = %subject.id,
        pool_size = pool.len(),
        chunks,
        duration_ms = start.elapsed().as_millis() as u64,
        "Pool scored"
    );

    Ok(assemble(engine, entries, threshold, limit))
}
