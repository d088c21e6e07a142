//! # kinship-match
//!
//! Pairwise compatibility scoring and pool ranking for kinship.
//!
//! This crate provides:
//! - A versioned, file-loadable scoring table ([`ScoringConfig`])
//! - The explainable pairwise scorer ([`score`])
//! - Pool ranking into a [`MatchEnvelope`], split into a parallelisable
//!   scoring half and a sequential merge half
//!
//! ## Example
//!
//! ```ignore
//! use kinship_match::{rank, MatchEngine};
//!
//! let engine = MatchEngine::from_env()?;
//! let subject = record.to_subject()?;
//! let envelope = rank(&engine, &subject, &pool, 60.0, 10);
//! for entry in &envelope.matches {
//!     println!("{} {:.1}", entry.name, entry.final_score);
//! }
//! ```

pub mod config;
pub mod engine;
pub mod ranker;
pub mod scorer;

// Re-export core types
pub use kinship_core::*;

pub use config::{
    AgePenaltyCurve, AlignmentRule, HighValueRule, OppositionRule, ScoringConfig,
    SCORING_CONFIG_ENV,
};
pub use engine::MatchEngine;
pub use ranker::{assemble, rank, score_candidates};
pub use scorer::{score, shared_interests};
