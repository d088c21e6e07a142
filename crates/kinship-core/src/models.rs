//! Core data models for kinship.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults::{LIKERT_MAX, LIKERT_MIN};
use crate::error::{Error, Result};

// =============================================================================
// DIMENSIONS
// =============================================================================

/// One rated dimension of the questionnaire.
///
/// Declaration order is the canonical iteration order: every sum over
/// dimensions runs in this order so results are bit-for-bit reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    // Core ratings
    Agency,
    Preparedness,
    LocationFreedom,
    SettlementDesire,
    FamilyOrientation,
    RiskTolerance,
    SelfSufficiency,
    Collaboration,
    Spirituality,
    EcologicalCommitment,
    FinancialReadiness,
    // Community interests
    InterestIntentionalCommunity,
    InterestPermaculture,
    InterestHomesteading,
    InterestGovernance,
    InterestEducation,
    InterestArts,
    InterestTechnology,
}

impl Dimension {
    /// Every dimension, in canonical order.
    pub const ALL: [Dimension; 18] = [
        Dimension::Agency,
        Dimension::Preparedness,
        Dimension::LocationFreedom,
        Dimension::SettlementDesire,
        Dimension::FamilyOrientation,
        Dimension::RiskTolerance,
        Dimension::SelfSufficiency,
        Dimension::Collaboration,
        Dimension::Spirituality,
        Dimension::EcologicalCommitment,
        Dimension::FinancialReadiness,
        Dimension::InterestIntentionalCommunity,
        Dimension::InterestPermaculture,
        Dimension::InterestHomesteading,
        Dimension::InterestGovernance,
        Dimension::InterestEducation,
        Dimension::InterestArts,
        Dimension::InterestTechnology,
    ];

    /// The seven community-interest dimensions.
    pub const INTEREST: [Dimension; 7] = [
        Dimension::InterestIntentionalCommunity,
        Dimension::InterestPermaculture,
        Dimension::InterestHomesteading,
        Dimension::InterestGovernance,
        Dimension::InterestEducation,
        Dimension::InterestArts,
        Dimension::InterestTechnology,
    ];

    /// Dimensions averaged into `readiness_score`.
    pub const READINESS: [Dimension; 3] = [
        Dimension::Agency,
        Dimension::Preparedness,
        Dimension::LocationFreedom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Agency => "agency",
            Dimension::Preparedness => "preparedness",
            Dimension::LocationFreedom => "location_freedom",
            Dimension::SettlementDesire => "settlement_desire",
            Dimension::FamilyOrientation => "family_orientation",
            Dimension::RiskTolerance => "risk_tolerance",
            Dimension::SelfSufficiency => "self_sufficiency",
            Dimension::Collaboration => "collaboration",
            Dimension::Spirituality => "spirituality",
            Dimension::EcologicalCommitment => "ecological_commitment",
            Dimension::FinancialReadiness => "financial_readiness",
            Dimension::InterestIntentionalCommunity => "interest_intentional_community",
            Dimension::InterestPermaculture => "interest_permaculture",
            Dimension::InterestHomesteading => "interest_homesteading",
            Dimension::InterestGovernance => "interest_governance",
            Dimension::InterestEducation => "interest_education",
            Dimension::InterestArts => "interest_arts",
            Dimension::InterestTechnology => "interest_technology",
        }
    }

    /// Whether this is one of the community-interest dimensions.
    pub fn is_interest(&self) -> bool {
        Self::INTEREST.contains(self)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("unknown dimension: {}", s)))
    }
}

// =============================================================================
// SURVEY RESPONSE
// =============================================================================

/// Preferred time of day for being contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactTime {
    Morning,
    Afternoon,
    Evening,
    Weekend,
}

/// The eight free-text answers of the questionnaire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeAnswers {
    pub motivation: Option<String>,
    pub skills: Option<String>,
    pub vision: Option<String>,
    pub contribution: Option<String>,
    pub concerns: Option<String>,
    pub ideal_day: Option<String>,
    pub dealbreakers: Option<String>,
    pub anything_else: Option<String>,
}

impl NarrativeAnswers {
    /// All answers with their field names, in questionnaire order.
    pub fn entries(&self) -> [(&'static str, Option<&str>); 8] {
        [
            ("motivation", self.motivation.as_deref()),
            ("skills", self.skills.as_deref()),
            ("vision", self.vision.as_deref()),
            ("contribution", self.contribution.as_deref()),
            ("concerns", self.concerns.as_deref()),
            ("ideal_day", self.ideal_day.as_deref()),
            ("dealbreakers", self.dealbreakers.as_deref()),
            ("anything_else", self.anything_else.as_deref()),
        ]
    }
}

/// A raw questionnaire submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Free-text social links, as typed by the submitter.
    #[serde(default)]
    pub social_links: Option<String>,
    #[serde(default)]
    pub contact_times: BTreeSet<ContactTime>,
    #[serde(default)]
    pub narrative: NarrativeAnswers,
    /// Likert ratings, 1-10, one per dimension.
    #[serde(default)]
    pub ratings: BTreeMap<Dimension, i32>,
}

impl SurveyResponse {
    /// "First Last", trimmed; empty parts are skipped.
    pub fn display_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }
}

fn join_name(first: &str, last: &str) -> String {
    [first.trim(), last.trim()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// ATTRIBUTE VECTOR
// =============================================================================

/// Normalized numeric profile derived from a survey response.
///
/// Always holds all 18 dimensions with values in [1, 10]; the only ways to
/// obtain one are the validating constructors, so accessors are infallible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "StoredVector", try_from = "StoredVector")]
pub struct AttributeVector {
    values: [f64; 18],
    readiness_score: f64,
    community_interest_avg: f64,
}

/// Serialized shape of an [`AttributeVector`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredVector {
    dimensions: BTreeMap<String, f64>,
    #[serde(default)]
    readiness_score: f64,
    #[serde(default)]
    community_interest_avg: f64,
}

impl AttributeVector {
    /// Build a vector from raw Likert ratings.
    ///
    /// Missing or out-of-range ratings are caller input errors.
    pub fn from_ratings(ratings: &BTreeMap<Dimension, i32>) -> Result<Self> {
        let mut values = [0.0; 18];
        for (slot, dim) in values.iter_mut().zip(Dimension::ALL) {
            let rating = ratings
                .get(&dim)
                .ok_or_else(|| Error::Validation(format!("missing rating: {}", dim)))?;
            if !(LIKERT_MIN..=LIKERT_MAX).contains(rating) {
                return Err(Error::Validation(format!(
                    "{} must be between {} and {}, got {}",
                    dim, LIKERT_MIN, LIKERT_MAX, rating
                )));
            }
            *slot = f64::from(*rating);
        }
        Ok(Self::from_values(values))
    }

    /// Rebuild a vector from its stored dimension map.
    ///
    /// A missing, non-finite or out-of-range dimension means the stored
    /// record is corrupt and yields [`Error::Integrity`]. Unknown keys are
    /// ignored.
    pub fn from_stored(map: &BTreeMap<String, f64>) -> Result<Self> {
        let mut values = [0.0; 18];
        for (slot, dim) in values.iter_mut().zip(Dimension::ALL) {
            let value = *map
                .get(dim.as_str())
                .ok_or_else(|| Error::Integrity(format!("stored vector missing {}", dim)))?;
            if !value.is_finite() || value < f64::from(LIKERT_MIN) || value > f64::from(LIKERT_MAX)
            {
                return Err(Error::Integrity(format!(
                    "stored vector has {} = {} outside the Likert range",
                    dim, value
                )));
            }
            *slot = value;
        }
        Ok(Self::from_values(values))
    }

    fn from_values(values: [f64; 18]) -> Self {
        let mean = |dims: &[Dimension]| -> f64 {
            let sum: f64 = dims.iter().map(|d| values[index_of(*d)]).sum();
            sum / dims.len() as f64
        };
        let readiness_score = mean(&Dimension::READINESS);
        let community_interest_avg = mean(&Dimension::INTEREST);
        Self {
            values,
            readiness_score,
            community_interest_avg,
        }
    }

    /// Value of one dimension.
    pub fn get(&self, dimension: Dimension) -> f64 {
        self.values[index_of(dimension)]
    }

    /// Mean of agency, preparedness and location freedom.
    pub fn readiness_score(&self) -> f64 {
        self.readiness_score
    }

    /// Mean of the seven community-interest dimensions.
    pub fn community_interest_avg(&self) -> f64 {
        self.community_interest_avg
    }

    /// Iterate `(dimension, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.iter().map(move |d| (*d, self.get(*d)))
    }

    /// The dimension map as persisted by stores.
    pub fn to_stored(&self) -> BTreeMap<String, f64> {
        self.iter()
            .map(|(d, v)| (d.as_str().to_string(), v))
            .collect()
    }
}

fn index_of(dimension: Dimension) -> usize {
    dimension as usize
}

impl From<AttributeVector> for StoredVector {
    fn from(v: AttributeVector) -> Self {
        Self {
            dimensions: v.to_stored(),
            readiness_score: v.readiness_score,
            community_interest_avg: v.community_interest_avg,
        }
    }
}

impl TryFrom<StoredVector> for AttributeVector {
    type Error = Error;

    // Derived scalars are recomputed, never trusted from storage.
    fn try_from(stored: StoredVector) -> Result<Self> {
        AttributeVector::from_stored(&stored.dimensions)
    }
}

// =============================================================================
// QUALITY METRICS
// =============================================================================

/// Data-quality signals for a single response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Percentage of the required-field checklist that is filled, 0-100.
    pub completeness: f64,
    /// Mean character length of the non-blank narrative answers.
    pub response_length_avg: f64,
    /// Percentage of alignment checks that pass, 0-100.
    pub consistency_score: f64,
}

// =============================================================================
// MATCHING
// =============================================================================

/// Decomposed, explainable score for one subject/candidate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetails {
    pub base_similarity: f64,
    pub weighted_distance: f64,
    pub alignment_bonus: f64,
    pub alignment_penalty: f64,
    pub opposition_penalty: f64,
    pub age_penalty: f64,
    pub final_score: f64,
    /// Absolute age gap in years; absent when either age is unknown.
    pub age_difference: Option<u32>,
    pub shared_high_interests: BTreeSet<Dimension>,
    pub opposing_values: BTreeSet<String>,
    pub alignment_issues: BTreeSet<String>,
}

impl MatchDetails {
    /// The combination rule every final score is produced by.
    pub fn combine(
        base_similarity: f64,
        alignment_bonus: f64,
        alignment_penalty: f64,
        opposition_penalty: f64,
        age_penalty: f64,
    ) -> f64 {
        (base_similarity + alignment_bonus - alignment_penalty - opposition_penalty - age_penalty)
            .clamp(0.0, 100.0)
    }

    /// Re-derive the final score from the stored components.
    pub fn reconstructed_score(&self) -> f64 {
        Self::combine(
            self.base_similarity,
            self.alignment_bonus,
            self.alignment_penalty,
            self.opposition_penalty,
            self.age_penalty,
        )
    }
}

/// One ranked candidate in a match envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEntry {
    pub candidate_id: Uuid,
    pub name: String,
    pub email: String,
    pub final_score: f64,
    pub details: MatchDetails,
    /// Community interests both parties rate highly.
    pub shared_interests: Vec<Dimension>,
}

/// Complete, versioned result of one matching run for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEnvelope {
    pub matches: Vec<MatchEntry>,
    /// Candidates meeting the threshold, counted before any limit applies.
    pub above_threshold: usize,
    /// Candidates actually scored.
    pub total_evaluated: usize,
    pub algorithm_version: String,
    /// SHA-256 of the scoring table the run used.
    pub config_digest: String,
    pub threshold: f64,
    pub calculated_at: DateTime<Utc>,
}

/// The profile being matched.
#[derive(Debug, Clone)]
pub struct MatchSubject {
    pub id: Uuid,
    pub vector: AttributeVector,
    pub age: Option<u32>,
}

/// One member of the candidate pool, as read from the store.
///
/// The attribute map is kept in its stored form; it is validated only when
/// the candidate is scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: Option<u32>,
    pub attributes: BTreeMap<String, f64>,
}

// =============================================================================
// STORED PROFILES
// =============================================================================

/// A profile ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub response: SurveyResponse,
    pub vector: AttributeVector,
    pub quality: QualityMetrics,
    pub match_opt_in: bool,
}

/// A profile as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub response: SurveyResponse,
    /// Stored dimension map; may be corrupt if the store was tampered with.
    pub attributes: BTreeMap<String, f64>,
    pub quality: QualityMetrics,
    pub match_opt_in: bool,
    /// The well-known output field, set once a matching run completes.
    pub matches: Option<MatchEnvelope>,
}

impl ProfileRecord {
    /// Validate and rebuild the stored attribute vector.
    pub fn attribute_vector(&self) -> Result<AttributeVector> {
        AttributeVector::from_stored(&self.attributes)
    }

    pub fn display_name(&self) -> String {
        self.response.display_name()
    }

    /// Build the matching subject for this profile.
    pub fn to_subject(&self) -> Result<MatchSubject> {
        Ok(MatchSubject {
            id: self.id,
            vector: self.attribute_vector()?,
            age: self.response.age,
        })
    }
}

impl From<&ProfileRecord> for Candidate {
    fn from(record: &ProfileRecord) -> Self {
        Self {
            id: record.id,
            name: record.display_name(),
            email: record.response.email.clone(),
            age: record.response.age,
            attributes: record.attributes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_ratings(value: i32) -> BTreeMap<Dimension, i32> {
        Dimension::ALL.iter().map(|d| (*d, value)).collect()
    }

    #[test]
    fn test_dimension_counts() {
        assert_eq!(Dimension::ALL.len(), 18);
        assert_eq!(Dimension::INTEREST.len(), 7);
        let core = Dimension::ALL.iter().filter(|d| !d.is_interest()).count();
        assert_eq!(core, 11);
    }

    #[test]
    fn test_dimension_index_matches_canonical_order() {
        for (i, d) in Dimension::ALL.iter().enumerate() {
            assert_eq!(index_of(*d), i, "{} out of order", d);
        }
    }

    #[test]
    fn test_dimension_round_trips_through_str() {
        for d in Dimension::ALL {
            assert_eq!(d.as_str().parse::<Dimension>().unwrap(), d);
        }
        assert!("charisma".parse::<Dimension>().is_err());
    }

    #[test]
    fn test_dimension_serde_matches_as_str() {
        let json = serde_json::to_string(&Dimension::InterestIntentionalCommunity).unwrap();
        assert_eq!(json, "\"interest_intentional_community\"");
    }

    #[test]
    fn test_from_ratings_rejects_missing() {
        let mut ratings = uniform_ratings(5);
        ratings.remove(&Dimension::Spirituality);
        let err = AttributeVector::from_ratings(&ratings).unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("spirituality")));
    }

    #[test]
    fn test_from_ratings_rejects_out_of_range() {
        let mut ratings = uniform_ratings(5);
        ratings.insert(Dimension::Agency, 11);
        assert!(matches!(
            AttributeVector::from_ratings(&ratings),
            Err(Error::Validation(_))
        ));
        ratings.insert(Dimension::Agency, 0);
        assert!(matches!(
            AttributeVector::from_ratings(&ratings),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_from_stored_missing_dimension_is_integrity_fault() {
        let mut stored = AttributeVector::from_ratings(&uniform_ratings(4))
            .unwrap()
            .to_stored();
        stored.remove("collaboration");
        let err = AttributeVector::from_stored(&stored).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
        assert!(err.is_persistence());
    }

    #[test]
    fn test_from_stored_rejects_nan() {
        let mut stored = AttributeVector::from_ratings(&uniform_ratings(4))
            .unwrap()
            .to_stored();
        stored.insert("agency".to_string(), f64::NAN);
        assert!(matches!(
            AttributeVector::from_stored(&stored),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn test_from_stored_ignores_unknown_keys() {
        let mut stored = AttributeVector::from_ratings(&uniform_ratings(6))
            .unwrap()
            .to_stored();
        stored.insert("legacy_field".to_string(), 99.0);
        let v = AttributeVector::from_stored(&stored).unwrap();
        assert_eq!(v.get(Dimension::Agency), 6.0);
    }

    #[test]
    fn test_vector_serde_recomputes_derived_scalars() {
        let v = AttributeVector::from_ratings(&uniform_ratings(8)).unwrap();
        let mut json = serde_json::to_value(&v).unwrap();
        json["readiness_score"] = serde_json::json!(1.0);
        let back: AttributeVector = serde_json::from_value(json).unwrap();
        assert_eq!(back.readiness_score(), 8.0);
        assert_eq!(back, v);
    }

    #[test]
    fn test_vector_deserialize_rejects_corrupt_map() {
        let json = serde_json::json!({ "dimensions": { "agency": 5.0 } });
        assert!(serde_json::from_value::<AttributeVector>(json).is_err());
    }

    #[test]
    fn test_combine_clamps() {
        assert_eq!(MatchDetails::combine(100.0, 10.0, 0.0, 0.0, 0.0), 100.0);
        assert_eq!(MatchDetails::combine(5.0, 0.0, 6.0, 8.0, 0.0), 0.0);
        assert_eq!(MatchDetails::combine(70.0, 2.0, 6.0, 0.0, 1.5), 64.5);
    }

    #[test]
    fn test_display_name_skips_blank_parts() {
        let response = SurveyResponse {
            first_name: " Ada ".to_string(),
            last_name: String::new(),
            ..Default::default()
        };
        assert_eq!(response.display_name(), "Ada");
    }

    #[test]
    fn test_survey_response_deserializes_with_defaults() {
        let json = r#"{
            "email": "ada@example.org",
            "first_name": "Ada",
            "contact_times": ["evening", "weekend"],
            "ratings": { "agency": 7 }
        }"#;
        let response: SurveyResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.age, None);
        assert_eq!(response.contact_times.len(), 2);
        assert_eq!(response.ratings.get(&Dimension::Agency), Some(&7));
        assert!(response.narrative.motivation.is_none());
    }
}
