//! # kinship-api
//!
//! HTTP surface of the kinship pipeline: accept questionnaire submissions
//! and hand back match envelopes once the worker has produced them.
//!
//! The binary in `main.rs` wires configuration, logging, the profile store
//! and the matching worker; [`router`] builds the routes over an
//! [`AppState`] so they can be exercised without a listening socket.

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{router, AppState, CreateProfileRequest, ProfileView, VectorSummary};
