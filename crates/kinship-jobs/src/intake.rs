//! Submission intake: validate, derive, persist, request matching.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use kinship_core::{
    assess, validate_response, vectorize, NewProfile, ProfileRepository, QualityMetrics, Result,
    SurveyResponse,
};

use crate::delivery::DeliveryState;
use crate::worker::MatchQueue;

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub quality: QualityMetrics,
    /// `PendingMatch` for opted-in profiles, `Submitted` otherwise.
    pub state: DeliveryState,
    /// Whether a matching run was queued right away.
    pub queued: bool,
}

/// Accept one questionnaire submission.
///
/// Validation happens before anything is written. A store failure is
/// returned as-is and never retried here. When `match_opt_in` is set and a
/// queue is supplied, a matching run is requested for the new profile.
#[instrument(
    skip(repo, response, queue),
    fields(subsystem = "jobs", component = "intake", op = "submit")
)]
pub async fn submit(
    repo: &dyn ProfileRepository,
    response: SurveyResponse,
    match_opt_in: bool,
    queue: Option<&MatchQueue>,
) -> Result<Submission> {
    validate_response(&response)?;
    let vector = vectorize(&response)?;
    let quality = assess(&response);

    let id = repo
        .insert(NewProfile {
            response,
            vector,
            quality,
            match_opt_in,
        })
        .await?;

    let queued = match (match_opt_in, queue) {
        (true, Some(queue)) => queue.enqueue(id),
        _ => false,
    };
    let state = if match_opt_in {
        DeliveryState::PendingMatch { attempts: 0 }
    } else {
        DeliveryState::Submitted
    };

    info!(
        profile_id = %id,
        match_opt_in,
        queued,
        completeness = quality.completeness,
        consistency = quality.consistency_score,
        "Submission stored"
    );

    Ok(Submission {
        id,
        quality,
        state,
        queued,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kinship_core::{
        Dimension, Error, MatchEnvelope, ProfileQuery, ProfileRecord,
    };
    use kinship_db::MemoryProfileStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn response() -> SurveyResponse {
        SurveyResponse {
            email: "ilse@example.org".to_string(),
            first_name: "Ilse".to_string(),
            last_name: "Marsh".to_string(),
            age: Some(29),
            ratings: Dimension::ALL.iter().map(|d| (*d, 6)).collect(),
            ..Default::default()
        }
    }

    /// Store that counts writes and always fails them.
    #[derive(Default)]
    struct FailingStore {
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl ProfileRepository for FailingStore {
        async fn insert(&self, _profile: NewProfile) -> Result<Uuid> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            Err(Error::Persistence("disk full".into()))
        }
        async fn get_by_id(&self, id: Uuid) -> Result<ProfileRecord> {
            Err(Error::ProfileNotFound(id))
        }
        async fn query_by_flags(&self, _query: ProfileQuery) -> Result<Vec<ProfileRecord>> {
            Ok(Vec::new())
        }
        async fn attach_matches(&self, id: Uuid, _envelope: MatchEnvelope) -> Result<()> {
            Err(Error::ProfileNotFound(id))
        }
    }

    #[tokio::test]
    async fn test_submit_stores_and_queues() {
        let store = MemoryProfileStore::new();
        let (queue, mut rx) = MatchQueue::channel(8);

        let submission = submit(&store, response(), true, Some(&queue)).await.unwrap();

        assert!(submission.queued);
        assert_eq!(submission.state, DeliveryState::PendingMatch { attempts: 0 });
        let record = store.get_by_id(submission.id).await.unwrap();
        assert_eq!(record.quality, submission.quality);
        assert!(record.match_opt_in);
        assert_eq!(rx.rx.recv().await, Some(submission.id));
    }

    #[tokio::test]
    async fn test_opt_out_is_not_queued() {
        let store = MemoryProfileStore::new();
        let (queue, _rx) = MatchQueue::channel(8);
        let submission = submit(&store, response(), false, Some(&queue)).await.unwrap();
        assert!(!submission.queued);
        assert_eq!(submission.state, DeliveryState::Submitted);
    }

    #[tokio::test]
    async fn test_invalid_rating_writes_nothing() {
        let store = FailingStore::default();
        let mut bad = response();
        bad.ratings.insert(Dimension::Collaboration, 12);

        let err = submit(&store, bad, true, None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_email_writes_nothing() {
        let store = MemoryProfileStore::new();
        let mut bad = response();
        bad.email = "not-an-email".to_string();
        assert!(matches!(
            submit(&store, bad, true, None).await,
            Err(Error::Validation(_))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced_once() {
        let store = FailingStore::default();
        let (queue, mut rx) = MatchQueue::channel(8);
        let err = submit(&store, response(), true, Some(&queue)).await.unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
        assert!(rx.rx.try_recv().is_err());
    }
}
