//! A validated scoring table bundled with its digest.

use std::sync::Arc;

use tracing::info;

use kinship_core::Result;

use crate::config::ScoringConfig;

/// Shared, immutable handle on the scoring table used by every run.
///
/// Cloning is cheap; all clones see the same table and digest.
#[derive(Debug, Clone)]
pub struct MatchEngine {
    config: Arc<ScoringConfig>,
    digest: Arc<str>,
}

impl MatchEngine {
    /// Validate the table and compute its digest once.
    pub fn new(config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        let digest = config.digest()?;
        info!(
            subsystem = "match",
            component = "engine",
            algorithm_version = %config.algorithm_version,
            config_digest = %digest,
            "Scoring engine ready"
        );
        Ok(Self {
            config: Arc::new(config),
            digest: Arc::from(digest),
        })
    }

    /// Engine over the table named by `KINSHIP_SCORING_CONFIG`, or the default.
    pub fn from_env() -> Result<Self> {
        Self::new(ScoringConfig::from_env()?)
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn version(&self) -> &str {
        &self.config.algorithm_version
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        let config = ScoringConfig::default();
        let digest = config.digest().unwrap_or_default();
        Self {
            config: Arc::new(config),
            digest: Arc::from(digest),
        }
    }
}
