//! Ranking a candidate pool against one subject.
//!
//! Ranking is split in two halves so callers can parallelise the expensive
//! one: [`score_candidates`] scores any slice of the pool independently, and
//! [`assemble`] merges the scored entries into a [`MatchEnvelope`]. Running
//! `assemble` over the concatenation of any chunking of the pool yields the
//! same envelope as scoring the whole pool at once.

use std::cmp::Ordering;

use chrono::Utc;
use tracing::{debug, warn};

use kinship_core::{AttributeVector, Candidate, MatchEntry, MatchEnvelope, MatchSubject};

use crate::config::ScoringConfig;
use crate::engine::MatchEngine;
use crate::scorer::{score, shared_interests};

/// Score every candidate in `candidates` against `subject`.
///
/// The subject's own id is skipped. Candidates whose stored vector fails
/// integrity checks are logged and skipped; they do not count as evaluated.
pub fn score_candidates(
    config: &ScoringConfig,
    subject: &MatchSubject,
    candidates: &[Candidate],
) -> Vec<MatchEntry> {
    let mut entries = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if candidate.id == subject.id {
            continue;
        }
        let vector = match AttributeVector::from_stored(&candidate.attributes) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    subsystem = "match",
                    component = "ranker",
                    candidate_id = %candidate.id,
                    error = %e,
                    "Skipping candidate with corrupt stored vector"
                );
                continue;
            }
        };
        let details = score(config, &subject.vector, &vector, subject.age, candidate.age);
        entries.push(MatchEntry {
            candidate_id: candidate.id,
            name: candidate.name.clone(),
            email: candidate.email.clone(),
            final_score: details.final_score,
            shared_interests: shared_interests(config, &subject.vector, &vector),
            details,
        });
    }
    entries
}

/// Descending score, then ascending candidate id.
fn rank_order(a: &MatchEntry, b: &MatchEntry) -> Ordering {
    b.final_score
        .total_cmp(&a.final_score)
        .then_with(|| a.candidate_id.cmp(&b.candidate_id))
}

/// Merge scored entries into the final envelope.
///
/// `total_evaluated` is the number of entries passed in; `above_threshold`
/// is counted before `limit` truncates the list.
pub fn assemble(
    engine: &MatchEngine,
    entries: Vec<MatchEntry>,
    threshold: f64,
    limit: usize,
) -> MatchEnvelope {
    let total_evaluated = entries.len();
    let mut matches: Vec<MatchEntry> = entries
        .into_iter()
        .filter(|e| e.final_score >= threshold)
        .collect();
    let above_threshold = matches.len();
    matches.sort_by(rank_order);
    matches.truncate(limit);

    debug!(
        subsystem = "match",
        component = "ranker",
        op = "assemble",
        total_evaluated,
        above_threshold,
        returned = matches.len(),
        threshold,
        "Match envelope assembled"
    );

    MatchEnvelope {
        matches,
        above_threshold,
        total_evaluated,
        algorithm_version: engine.version().to_string(),
        config_digest: engine.digest().to_string(),
        threshold,
        calculated_at: Utc::now(),
    }
}

/// Score and rank the whole pool sequentially.
pub fn rank(
    engine: &MatchEngine,
    subject: &MatchSubject,
    pool: &[Candidate],
    threshold: f64,
    limit: usize,
) -> MatchEnvelope {
    let entries = score_candidates(engine.config(), subject, pool);
    assemble(engine, entries, threshold, limit)
}
