//! Core traits for kinship abstractions.
//!
//! The record store is an external collaborator. These traits are the narrow
//! contract the pipeline reads and writes through, so concrete stores can be
//! swapped and tests can run without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// PROFILE REPOSITORY
// =============================================================================

/// Equality/ordering predicates for selecting stored profiles.
///
/// Unset fields do not filter. Results are always in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileQuery {
    /// Filter on the opt-in-to-matching flag.
    pub match_opt_in: Option<bool>,
    /// Filter on whether a match envelope has been attached.
    pub has_matches: Option<bool>,
    /// Only profiles created strictly before this instant.
    pub created_before: Option<DateTime<Utc>>,
    /// Maximum results
    pub limit: Option<usize>,
}

impl ProfileQuery {
    /// Profiles eligible to appear in someone's candidate pool.
    pub fn candidate_pool() -> Self {
        Self {
            match_opt_in: Some(true),
            ..Default::default()
        }
    }

    /// Profiles still waiting for a matching run.
    pub fn pending_matches() -> Self {
        Self {
            match_opt_in: Some(true),
            has_matches: Some(false),
            ..Default::default()
        }
    }

    pub fn with_created_before(mut self, ts: DateTime<Utc>) -> Self {
        self.created_before = Some(ts);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a record satisfies every set predicate (ignores `limit`).
    pub fn matches(&self, record: &ProfileRecord) -> bool {
        if let Some(opt_in) = self.match_opt_in {
            if record.match_opt_in != opt_in {
                return false;
            }
        }
        if let Some(has) = self.has_matches {
            if record.matches.is_some() != has {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if record.created_at >= before {
                return false;
            }
        }
        true
    }
}

/// Persistence contract for survey profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Persist a new profile and return its id.
    async fn insert(&self, profile: NewProfile) -> Result<Uuid>;

    /// Fetch a profile; `Error::ProfileNotFound` when absent.
    async fn get_by_id(&self, id: Uuid) -> Result<ProfileRecord>;

    /// Select profiles by flag predicates, in arrival order.
    async fn query_by_flags(&self, query: ProfileQuery) -> Result<Vec<ProfileRecord>>;

    /// Attach a match envelope to a profile, replacing any prior one.
    async fn attach_matches(&self, id: Uuid, envelope: MatchEnvelope) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn record(opt_in: bool, with_matches: bool, created_at: DateTime<Utc>) -> ProfileRecord {
        ProfileRecord {
            id: Uuid::now_v7(),
            created_at,
            response: SurveyResponse::default(),
            attributes: BTreeMap::new(),
            quality: QualityMetrics {
                completeness: 0.0,
                response_length_avg: 0.0,
                consistency_score: 100.0,
            },
            match_opt_in: opt_in,
            matches: with_matches.then(|| MatchEnvelope {
                matches: Vec::new(),
                above_threshold: 0,
                total_evaluated: 0,
                algorithm_version: "test".to_string(),
                config_digest: String::new(),
                threshold: 60.0,
                calculated_at: created_at,
            }),
        }
    }

    #[test]
    fn test_default_query_matches_everything() {
        let now = Utc::now();
        let q = ProfileQuery::default();
        assert!(q.matches(&record(true, true, now)));
        assert!(q.matches(&record(false, false, now)));
    }

    #[test]
    fn test_candidate_pool_requires_opt_in() {
        let now = Utc::now();
        let q = ProfileQuery::candidate_pool();
        assert!(q.matches(&record(true, false, now)));
        assert!(q.matches(&record(true, true, now)));
        assert!(!q.matches(&record(false, false, now)));
    }

    #[test]
    fn test_pending_matches_excludes_matched() {
        let now = Utc::now();
        let q = ProfileQuery::pending_matches();
        assert!(q.matches(&record(true, false, now)));
        assert!(!q.matches(&record(true, true, now)));
    }

    #[test]
    fn test_created_before_is_strict() {
        let now = Utc::now();
        let q = ProfileQuery::default().with_created_before(now);
        assert!(!q.matches(&record(true, false, now)));
        assert!(q.matches(&record(true, false, now - Duration::seconds(1))));
    }

    #[test]
    fn test_with_limit() {
        assert_eq!(ProfileQuery::default().with_limit(5).limit, Some(5));
    }
}
