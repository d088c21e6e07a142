//! # kinship-core
//!
//! Core types, traits, and the first stage of the kinship pipeline.
//!
//! This crate provides:
//! - The survey, profile and match envelope data model
//! - The persistence contract ([`ProfileRepository`])
//! - Profile vectorization ([`vectorize`]) and quality assessment ([`assess`])
//! - Input shape validation
//!
//! ## Example
//!
//! ```ignore
//! use kinship_core::{assess, validate_response, vectorize};
//!
//! validate_response(&response)?;
//! let vector = vectorize(&response)?;
//! let quality = assess(&response);
//! println!("readiness {:.1}", vector.readiness_score());
//! ```

pub mod defaults;
pub mod error;
pub mod models;
pub mod quality;
pub mod traits;
pub mod validation;
pub mod vectorize;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use quality::{assess, assess_with, ConsistencyCheck, QualityConfig};
pub use traits::*;
pub use validation::{is_valid_email, validate_response};
pub use vectorize::vectorize;
