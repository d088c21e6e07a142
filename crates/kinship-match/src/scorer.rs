//! Pairwise compatibility scoring.
//!
//! Scoring is symmetric: every term is invariant under swapping subject and
//! candidate, so `score(a, b)` equals `score(b, a)` field for field and a
//! score computed in one direction may be reused for the other.
//!
//! # Combination
//!
//! | Term | Rule |
//! |------|------|
//! | weighted distance | Σ weight · \|s − c\| over all 18 dimensions |
//! | base similarity | max(0, 100 − distance · k) |
//! | alignment bonus | per high-value dimension both parties rate ≥ high |
//! | alignment penalty | per rule dimension with gap ≥ alignment_gap and one side ≥ high |
//! | opposition penalty | per trade-off pair where the parties sit at opposite poles |
//! | age penalty | piecewise-linear curve on \|age_s − age_c\| |
//! | final | clamp(base + bonus − penalties, 0, 100) |

use std::collections::BTreeSet;

use tracing::trace;

use kinship_core::{AttributeVector, Dimension, MatchDetails};

use crate::config::{OppositionRule, ScoringConfig};

/// Score one subject/candidate pair.
pub fn score(
    config: &ScoringConfig,
    subject: &AttributeVector,
    candidate: &AttributeVector,
    subject_age: Option<u32>,
    candidate_age: Option<u32>,
) -> MatchDetails {
    let weighted_distance: f64 = Dimension::ALL
        .iter()
        .map(|d| config.weight(*d) * (subject.get(*d) - candidate.get(*d)).abs())
        .sum();
    let base_similarity = (100.0 - weighted_distance * config.distance_scale()).max(0.0);

    let mut alignment_bonus = 0.0;
    let mut shared_high_interests = BTreeSet::new();
    for rule in &config.high_value {
        if subject.get(rule.dimension) >= config.high_threshold
            && candidate.get(rule.dimension) >= config.high_threshold
        {
            alignment_bonus += rule.bonus;
            shared_high_interests.insert(rule.dimension);
        }
    }

    let mut alignment_penalty = 0.0;
    let mut alignment_issues = BTreeSet::new();
    for rule in &config.alignment_rules {
        let s = subject.get(rule.dimension);
        let c = candidate.get(rule.dimension);
        if (s - c).abs() >= config.alignment_gap && s.max(c) >= config.high_threshold {
            alignment_penalty += rule.penalty;
            alignment_issues.insert(rule.label.clone());
        }
    }

    let mut opposition_penalty = 0.0;
    let mut opposing_values = BTreeSet::new();
    for rule in &config.opposition_rules {
        if at_opposite_poles(config, rule, subject, candidate)
            || at_opposite_poles(config, rule, candidate, subject)
        {
            opposition_penalty += rule.penalty;
            opposing_values.insert(rule.label.clone());
        }
    }

    let age_difference = match (subject_age, candidate_age) {
        (Some(a), Some(b)) => Some(a.abs_diff(b)),
        _ => None,
    };
    let age_penalty = age_difference
        .map(|d| config.age.penalty(d))
        .unwrap_or(0.0);

    let final_score = MatchDetails::combine(
        base_similarity,
        alignment_bonus,
        alignment_penalty,
        opposition_penalty,
        age_penalty,
    );

    trace!(
        subsystem = "match",
        component = "scorer",
        weighted_distance,
        base_similarity,
        alignment_bonus,
        alignment_penalty,
        opposition_penalty,
        age_penalty,
        final_score,
        "Pair scored"
    );

    MatchDetails {
        base_similarity,
        weighted_distance,
        alignment_bonus,
        alignment_penalty,
        opposition_penalty,
        age_penalty,
        final_score,
        age_difference,
        shared_high_interests,
        opposing_values,
        alignment_issues,
    }
}

/// `a` is high on `first` and low on `second`; `b` is the mirror image.
fn at_opposite_poles(
    config: &ScoringConfig,
    rule: &OppositionRule,
    a: &AttributeVector,
    b: &AttributeVector,
) -> bool {
    let high = config.high_threshold;
    let low = config.low_threshold;
    a.get(rule.first) >= high
        && a.get(rule.second) <= low
        && b.get(rule.second) >= high
        && b.get(rule.first) <= low
}

/// Community-interest dimensions both parties rate at or above the high
/// threshold, in canonical order.
pub fn shared_interests(
    config: &ScoringConfig,
    subject: &AttributeVector,
    candidate: &AttributeVector,
) -> Vec<Dimension> {
    Dimension::INTEREST
        .iter()
        .copied()
        .filter(|d| {
            subject.get(*d) >= config.high_threshold && candidate.get(*d) >= config.high_threshold
        })
        .collect()
}
