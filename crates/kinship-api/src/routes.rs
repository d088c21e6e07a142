//! Route table and handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, instrument};
use uuid::Uuid;

use kinship_core::{MatchEnvelope, ProfileRecord, ProfileRepository, QualityMetrics, SurveyResponse};
use kinship_jobs::{submit, DeliveryState, MatchQueue};

use crate::error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ProfileRepository>,
    /// Absent when the matching worker is disabled; profiles then wait for
    /// the recovery sweep of a later worker start.
    pub queue: Option<MatchQueue>,
}

impl AppState {
    pub fn new(repo: Arc<dyn ProfileRepository>, queue: Option<MatchQueue>) -> Self {
        Self { repo, queue }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/profiles", post(create_profile))
        .route("/api/v1/profiles/:id", get(get_profile))
        .route("/api/v1/profiles/:id/matches", get(get_matches))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// REQUEST / RESPONSE BODIES
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProfileRequest {
    pub response: SurveyResponse,
    #[serde(default)]
    pub match_opt_in: bool,
}

#[derive(Debug, Serialize)]
struct CreateProfileResponse {
    id: Uuid,
    state: DeliveryState,
    quality: QualityMetrics,
    queued: bool,
}

/// Headline numbers of a stored attribute vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSummary {
    pub readiness_score: f64,
    pub community_interest_avg: f64,
}

/// Public view of a stored profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub age: Option<u32>,
    pub match_opt_in: bool,
    pub quality: QualityMetrics,
    /// Null when the stored vector no longer validates.
    pub vector: Option<VectorSummary>,
    pub matches: Option<MatchEnvelope>,
}

impl From<ProfileRecord> for ProfileView {
    fn from(record: ProfileRecord) -> Self {
        let vector = record.attribute_vector().ok().map(|v| VectorSummary {
            readiness_score: v.readiness_score(),
            community_interest_avg: v.community_interest_avg(),
        });
        Self {
            id: record.id,
            created_at: record.created_at,
            name: record.display_name(),
            email: record.response.email,
            age: record.response.age,
            match_opt_in: record.match_opt_in,
            quality: record.quality,
            vector,
            matches: record.matches,
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[instrument(
    skip(state, body),
    fields(subsystem = "api", component = "profiles", op = "create")
)]
async fn create_profile(
    State(state): State<AppState>,
    body: Result<Json<CreateProfileRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let submission = submit(
        state.repo.as_ref(),
        body.response,
        body.match_opt_in,
        state.queue.as_ref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateProfileResponse {
            id: submission.id,
            state: submission.state,
            quality: submission.quality,
            queued: submission.queued,
        }),
    ))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileView>, ApiError> {
    let record = state.repo.get_by_id(id).await?;
    Ok(Json(ProfileView::from(record)))
}

/// One poll of the delivery protocol: the envelope once it exists, 202
/// while the run is outstanding.
#[instrument(
    skip(state),
    fields(subsystem = "api", component = "profiles", op = "get_matches", profile_id = %id)
)]
async fn get_matches(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let record = state.repo.get_by_id(id).await?;
    match record.matches {
        Some(envelope) => Ok(Json(envelope).into_response()),
        None if record.match_opt_in => {
            debug!("Envelope not attached yet");
            Ok((
                StatusCode::ACCEPTED,
                Json(DeliveryState::PendingMatch { attempts: 0 }),
            )
                .into_response())
        }
        None => Err(ApiError::NotFound(format!(
            "Profile {} did not opt in to matching",
            id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(attributes: BTreeMap<String, f64>) -> ProfileRecord {
        ProfileRecord {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            response: SurveyResponse {
                email: "wren@example.org".to_string(),
                first_name: "Wren".to_string(),
                last_name: "Oakes".to_string(),
                age: Some(41),
                ..Default::default()
            },
            attributes,
            quality: QualityMetrics {
                completeness: 50.0,
                response_length_avg: 0.0,
                consistency_score: 100.0,
            },
            match_opt_in: true,
            matches: None,
        }
    }

    #[test]
    fn test_view_of_corrupt_vector_has_no_summary() {
        let view = ProfileView::from(record(BTreeMap::from([("agency".to_string(), 4.0)])));
        assert_eq!(view.name, "Wren Oakes");
        assert_eq!(view.age, Some(41));
        assert!(view.vector.is_none());
        assert!(view.matches.is_none());
    }

    #[test]
    fn test_pending_body_shape() {
        let body = serde_json::to_value(DeliveryState::PendingMatch { attempts: 0 }).unwrap();
        assert_eq!(body["state"], "pending_match");
    }
}
