//! Centralized default constants for the kinship system.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Scoring constants here only seed `ScoringConfig::default()`; a
//! deployed table may override every one of them.

// =============================================================================
// LIKERT SCALE
// =============================================================================

/// Lowest accepted Likert rating.
pub const LIKERT_MIN: i32 = 1;

/// Highest accepted Likert rating.
pub const LIKERT_MAX: i32 = 10;

/// Largest possible per-dimension difference on the Likert scale.
pub const LIKERT_SPAN: f64 = (LIKERT_MAX - LIKERT_MIN) as f64;

// =============================================================================
// QUALITY ASSESSMENT
// =============================================================================

/// Maximum absolute difference for an alignment check to pass.
pub const CONSISTENCY_TOLERANCE: f64 = 3.0;

// =============================================================================
// SCORING
// =============================================================================

/// Version tag of the default scoring table. Bump whenever a default changes.
pub const ALGORITHM_VERSION: &str = "weighted-v1";

/// Rating at or above which a dimension counts as "high".
pub const HIGH_THRESHOLD: f64 = 7.0;

/// Rating at or below which a dimension counts as "low".
pub const LOW_THRESHOLD: f64 = 3.0;

/// Minimum difference on a single dimension for an alignment issue.
pub const ALIGNMENT_GAP: f64 = 5.0;

/// Bonus per shared high-value dimension.
pub const HIGH_VALUE_BONUS: f64 = 2.0;

/// Penalty per triggered alignment rule.
pub const ALIGNMENT_PENALTY: f64 = 6.0;

/// Penalty per triggered opposition rule.
pub const OPPOSITION_PENALTY: f64 = 8.0;

/// Age difference (years) that carries no penalty.
pub const AGE_TOLERANCE_YEARS: u32 = 10;

/// Penalty per year beyond the tolerance band.
pub const AGE_PENALTY_PER_YEAR: f64 = 1.5;

/// Upper bound of the age penalty.
pub const AGE_PENALTY_MAX: f64 = 25.0;

// =============================================================================
// MATCHING
// =============================================================================

/// Minimum final score for a candidate to appear in an envelope.
pub const MATCH_THRESHOLD: f64 = 60.0;

/// Maximum entries returned in an envelope.
pub const MATCH_LIMIT: usize = 10;

/// Default number of candidates scored per blocking task.
pub const MATCH_CHUNK_SIZE: usize = 64;

/// Default maximum concurrent matching runs per worker.
pub const MATCH_MAX_CONCURRENT: usize = 4;

/// Default capacity of the match request queue.
pub const MATCH_QUEUE_CAPACITY: usize = 1024;

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// RESULT DELIVERY
// =============================================================================

/// Delay between two polls of the subject record, in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 3_000;

/// Number of polls before the delivery ends as timed out.
pub const POLL_MAX_ATTEMPTS: u32 = 20;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;
