//! Versioned scoring configuration.
//!
//! Every weight, threshold, bonus and penalty the scorer uses lives in
//! [`ScoringConfig`]. The whole table is versioned as one unit through
//! `algorithm_version`, and each envelope also records the SHA-256 digest of
//! the serialized table so historical results stay interpretable even when
//! someone forgets to bump the version.
//!
//! Tables can be loaded from JSON or YAML:
//!
//! ```yaml
//! algorithm_version: weighted-v2
//! weights:
//!   settlement_desire: 2.5
//! high_threshold: 7.0
//! low_threshold: 3.0
//! alignment_gap: 5.0
//! high_value:
//!   - { dimension: collaboration, bonus: 3.0 }
//! alignment_rules: []
//! opposition_rules: []
//! age: { tolerance_years: 8, per_year: 2.0, max_penalty: 20.0 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use kinship_core::defaults::{
    AGE_PENALTY_MAX, AGE_PENALTY_PER_YEAR, AGE_TOLERANCE_YEARS, ALGORITHM_VERSION, ALIGNMENT_GAP,
    ALIGNMENT_PENALTY, HIGH_THRESHOLD, HIGH_VALUE_BONUS, LIKERT_MAX, LIKERT_MIN, LIKERT_SPAN,
    LOW_THRESHOLD, OPPOSITION_PENALTY,
};
use kinship_core::{Dimension, Error, Result};

/// Environment variable naming a scoring table file.
pub const SCORING_CONFIG_ENV: &str = "KINSHIP_SCORING_CONFIG";

/// Bonus granted when both parties rate a dimension highly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighValueRule {
    pub dimension: Dimension,
    pub bonus: f64,
}

/// Penalty for a wide gap on one dimension where at least one party is high.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRule {
    pub label: String,
    pub dimension: Dimension,
    pub penalty: f64,
}

/// Penalty for two parties sitting at opposite poles of a trade-off.
///
/// Triggers when one party is high on `first` and low on `second` while the
/// other is high on `second` and low on `first`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OppositionRule {
    pub label: String,
    pub first: Dimension,
    pub second: Dimension,
    pub penalty: f64,
}

/// Piecewise-linear age penalty: free inside the tolerance band, then
/// `per_year` for each extra year, capped at `max_penalty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgePenaltyCurve {
    pub tolerance_years: u32,
    pub per_year: f64,
    pub max_penalty: f64,
}

impl Default for AgePenaltyCurve {
    fn default() -> Self {
        Self {
            tolerance_years: AGE_TOLERANCE_YEARS,
            per_year: AGE_PENALTY_PER_YEAR,
            max_penalty: AGE_PENALTY_MAX,
        }
    }
}

impl AgePenaltyCurve {
    /// Penalty for an absolute age difference in years.
    pub fn penalty(&self, difference: u32) -> f64 {
        let excess = difference.saturating_sub(self.tolerance_years);
        (f64::from(excess) * self.per_year).min(self.max_penalty)
    }
}

/// The complete scoring table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Version tag; bump whenever any value below changes.
    pub algorithm_version: String,
    /// Per-dimension weights; dimensions absent here weigh 1.0.
    #[serde(default)]
    pub weights: BTreeMap<Dimension, f64>,
    pub high_threshold: f64,
    pub low_threshold: f64,
    /// Minimum single-dimension gap for an alignment issue.
    pub alignment_gap: f64,
    #[serde(default)]
    pub high_value: Vec<HighValueRule>,
    #[serde(default)]
    pub alignment_rules: Vec<AlignmentRule>,
    #[serde(default)]
    pub opposition_rules: Vec<OppositionRule>,
    #[serde(default)]
    pub age: AgePenaltyCurve,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let weights = [
            (Dimension::SettlementDesire, 2.0),
            (Dimension::LocationFreedom, 1.5),
            (Dimension::FamilyOrientation, 1.5),
            (Dimension::Collaboration, 1.5),
            (Dimension::Agency, 1.25),
            (Dimension::EcologicalCommitment, 1.25),
        ]
        .into_iter()
        .collect();

        let high_value = [
            Dimension::SettlementDesire,
            Dimension::EcologicalCommitment,
            Dimension::Collaboration,
            Dimension::InterestIntentionalCommunity,
            Dimension::InterestPermaculture,
        ]
        .into_iter()
        .map(|dimension| HighValueRule {
            dimension,
            bonus: HIGH_VALUE_BONUS,
        })
        .collect();

        let alignment_rules = [
            ("founding_intent", Dimension::SettlementDesire),
            ("financial_footing", Dimension::FinancialReadiness),
            ("spiritual_life", Dimension::Spirituality),
        ]
        .into_iter()
        .map(|(label, dimension)| AlignmentRule {
            label: label.to_string(),
            dimension,
            penalty: ALIGNMENT_PENALTY,
        })
        .collect();

        let opposition_rules = [
            (
                "mobility_vs_family",
                Dimension::LocationFreedom,
                Dimension::FamilyOrientation,
            ),
            (
                "risk_vs_preparedness",
                Dimension::RiskTolerance,
                Dimension::Preparedness,
            ),
            (
                "independence_vs_collaboration",
                Dimension::SelfSufficiency,
                Dimension::Collaboration,
            ),
        ]
        .into_iter()
        .map(|(label, first, second)| OppositionRule {
            label: label.to_string(),
            first,
            second,
            penalty: OPPOSITION_PENALTY,
        })
        .collect();

        Self {
            algorithm_version: ALGORITHM_VERSION.to_string(),
            weights,
            high_threshold: HIGH_THRESHOLD,
            low_threshold: LOW_THRESHOLD,
            alignment_gap: ALIGNMENT_GAP,
            high_value,
            alignment_rules,
            opposition_rules,
            age: AgePenaltyCurve::default(),
        }
    }
}

impl ScoringConfig {
    /// Weight of a dimension (1.0 when not listed).
    pub fn weight(&self, dimension: Dimension) -> f64 {
        self.weights.get(&dimension).copied().unwrap_or(1.0)
    }

    /// Largest possible weighted distance between two valid vectors.
    pub fn max_distance(&self) -> f64 {
        Dimension::ALL
            .iter()
            .map(|d| self.weight(*d) * LIKERT_SPAN)
            .sum()
    }

    /// Scale constant `k`: maps the maximum distance to 0 similarity.
    pub fn distance_scale(&self) -> f64 {
        let max = self.max_distance();
        if max > 0.0 {
            100.0 / max
        } else {
            0.0
        }
    }

    /// Reject tables the scorer cannot interpret.
    pub fn validate(&self) -> Result<()> {
        if self.algorithm_version.trim().is_empty() {
            return Err(Error::Config("algorithm_version must not be empty".into()));
        }
        let scale = f64::from(LIKERT_MIN)..=f64::from(LIKERT_MAX);
        if !scale.contains(&self.high_threshold) || !scale.contains(&self.low_threshold) {
            return Err(Error::Config(format!(
                "thresholds must lie within [{}, {}]",
                LIKERT_MIN, LIKERT_MAX
            )));
        }
        if self.low_threshold >= self.high_threshold {
            return Err(Error::Config(
                "low_threshold must be below high_threshold".into(),
            ));
        }
        if self.alignment_gap.is_nan() || self.alignment_gap <= 0.0 {
            return Err(Error::Config("alignment_gap must be positive".into()));
        }
        if let Some((dim, w)) = self
            .weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(Error::Config(format!(
                "weight for {} must be a non-negative number, got {}",
                dim, w
            )));
        }
        let max_distance = self.max_distance();
        if !max_distance.is_finite() || max_distance <= 0.0 {
            return Err(Error::Config(
                "at least one dimension must carry a positive weight".into(),
            ));
        }
        let amounts = self
            .high_value
            .iter()
            .map(|r| (r.dimension.as_str(), r.bonus))
            .chain(
                self.alignment_rules
                    .iter()
                    .map(|r| (r.label.as_str(), r.penalty)),
            )
            .chain(
                self.opposition_rules
                    .iter()
                    .map(|r| (r.label.as_str(), r.penalty)),
            );
        for (name, amount) in amounts {
            if !amount.is_finite() || amount < 0.0 {
                return Err(Error::Config(format!(
                    "{} must carry a non-negative amount, got {}",
                    name, amount
                )));
            }
        }
        if let Some(rule) = self.opposition_rules.iter().find(|r| r.first == r.second) {
            return Err(Error::Config(format!(
                "opposition rule {} pairs a dimension with itself",
                rule.label
            )));
        }
        if !self.age.per_year.is_finite()
            || self.age.per_year < 0.0
            || !self.age.max_penalty.is_finite()
            || self.age.max_penalty < 0.0
        {
            return Err(Error::Config(
                "age penalty curve must be non-negative".into(),
            ));
        }
        Ok(())
    }

    /// Hex SHA-256 of the serialized table.
    pub fn digest(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Load a table from a `.json`, `.yaml` or `.yml` file and validate it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: ScoringConfig = if is_yaml {
            serde_yaml::from_str(&text)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?
        } else {
            serde_json::from_str(&text)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?
        };
        config.validate()?;
        info!(
            subsystem = "match",
            component = "config",
            path = %path.display(),
            algorithm_version = %config.algorithm_version,
            "Loaded scoring table"
        );
        Ok(config)
    }

    /// Load the table named by `KINSHIP_SCORING_CONFIG`, or the default.
    pub fn from_env() -> Result<Self> {
        match std::env::var(SCORING_CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(path.trim()),
            _ => {
                debug!(
                    subsystem = "match",
                    component = "config",
                    "No scoring table configured, using defaults"
                );
                Ok(Self::default())
            }
        }
    }
}
