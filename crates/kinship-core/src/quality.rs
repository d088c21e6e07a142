//! Per-response quality assessment.
//!
//! Quality is computed from a single response in isolation: how much of the
//! required checklist is filled, how much the submitter wrote, and whether
//! ratings that should move together actually do.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::defaults::CONSISTENCY_TOLERANCE;
use crate::models::{Dimension, QualityMetrics, SurveyResponse};

/// A pair of dimensions expected to move together within one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyCheck {
    pub label: String,
    pub first: Dimension,
    pub second: Dimension,
}

impl ConsistencyCheck {
    pub fn new(label: impl Into<String>, first: Dimension, second: Dimension) -> Self {
        Self {
            label: label.into(),
            first,
            second,
        }
    }
}

/// Alignment-check table and tolerance used by [`assess_with`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Maximum absolute difference for a check to pass.
    pub tolerance: f64,
    pub checks: Vec<ConsistencyCheck>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            tolerance: CONSISTENCY_TOLERANCE,
            checks: vec![
                ConsistencyCheck::new(
                    "founding_intent",
                    Dimension::SettlementDesire,
                    Dimension::InterestIntentionalCommunity,
                ),
                ConsistencyCheck::new(
                    "ecological_practice",
                    Dimension::EcologicalCommitment,
                    Dimension::InterestPermaculture,
                ),
                ConsistencyCheck::new(
                    "self_reliance",
                    Dimension::SelfSufficiency,
                    Dimension::InterestHomesteading,
                ),
                ConsistencyCheck::new(
                    "shared_governance",
                    Dimension::Collaboration,
                    Dimension::InterestGovernance,
                ),
            ],
        }
    }
}

/// Number of entries in the required-field checklist.
pub const REQUIRED_FIELD_COUNT: usize = 11;

/// Contact basics followed by the eight narrative answers.
fn required_fields(response: &SurveyResponse) -> [Option<&str>; REQUIRED_FIELD_COUNT] {
    let n = response.narrative.entries();
    [
        Some(response.email.as_str()),
        Some(response.first_name.as_str()),
        Some(response.last_name.as_str()),
        n[0].1,
        n[1].1,
        n[2].1,
        n[3].1,
        n[4].1,
        n[5].1,
        n[6].1,
        n[7].1,
    ]
}

fn is_filled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Assess a response with the default check table.
pub fn assess(response: &SurveyResponse) -> QualityMetrics {
    assess_with(&QualityConfig::default(), response)
}

/// Assess a response against a custom check table.
pub fn assess_with(config: &QualityConfig, response: &SurveyResponse) -> QualityMetrics {
    let filled = required_fields(response)
        .iter()
        .filter(|v| is_filled(**v))
        .count();
    let completeness = filled as f64 / REQUIRED_FIELD_COUNT as f64 * 100.0;

    let lengths: Vec<usize> = response
        .narrative
        .entries()
        .iter()
        .filter_map(|(_, v)| v.map(str::trim))
        .filter(|v| !v.is_empty())
        .map(|v| v.chars().count())
        .collect();
    let response_length_avg = if lengths.is_empty() {
        0.0
    } else {
        lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
    };

    let consistency_score = if config.checks.is_empty() {
        100.0
    } else {
        let passed = config
            .checks
            .iter()
            .filter(|check| {
                match (
                    response.ratings.get(&check.first),
                    response.ratings.get(&check.second),
                ) {
                    (Some(a), Some(b)) => f64::from((a - b).abs()) <= config.tolerance,
                    _ => false,
                }
            })
            .count();
        passed as f64 / config.checks.len() as f64 * 100.0
    };

    debug!(
        subsystem = "core",
        component = "quality",
        completeness,
        response_length_avg,
        consistency_score,
        "Response assessed"
    );

    QualityMetrics {
        completeness,
        response_length_avg,
        consistency_score,
    }
}
