//! In-process profile store.
//!
//! Backs development servers without `DATABASE_URL` and every test that
//! needs a [`ProfileRepository`]. Records are kept in arrival order.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use kinship_core::{
    Error, MatchEnvelope, NewProfile, ProfileQuery, ProfileRecord, ProfileRepository, Result,
};

#[derive(Default)]
struct Inner {
    records: Vec<ProfileRecord>,
    index: HashMap<Uuid, usize>,
}

/// [`ProfileRepository`] held entirely in memory.
#[derive(Default)]
pub struct MemoryProfileStore {
    inner: RwLock<Inner>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fully formed record as-is, e.g. when importing an export.
    ///
    /// Nothing is validated; a record with the same id is replaced in place.
    pub async fn seed(&self, record: ProfileRecord) {
        let mut inner = self.inner.write().await;
        match inner.index.get(&record.id).copied() {
            Some(pos) => inner.records[pos] = record,
            None => {
                let pos = inner.records.len();
                inner.index.insert(record.id, pos);
                inner.records.push(record);
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ProfileRepository for MemoryProfileStore {
    async fn insert(&self, profile: NewProfile) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let record = ProfileRecord {
            id,
            created_at: Utc::now(),
            attributes: profile.vector.to_stored(),
            response: profile.response,
            quality: profile.quality,
            match_opt_in: profile.match_opt_in,
            matches: None,
        };
        self.seed(record).await;
        debug!(
            subsystem = "database",
            component = "memory_store",
            op = "insert",
            profile_id = %id,
            "Profile stored"
        );
        Ok(id)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<ProfileRecord> {
        let inner = self.inner.read().await;
        inner
            .index
            .get(&id)
            .map(|pos| inner.records[*pos].clone())
            .ok_or(Error::ProfileNotFound(id))
    }

    async fn query_by_flags(&self, query: ProfileQuery) -> Result<Vec<ProfileRecord>> {
        let inner = self.inner.read().await;
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(inner
            .records
            .iter()
            .filter(|r| query.matches(r))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn attach_matches(&self, id: Uuid, envelope: MatchEnvelope) -> Result<()> {
        let mut inner = self.inner.write().await;
        let pos = *inner.index.get(&id).ok_or(Error::ProfileNotFound(id))?;
        inner.records[pos].matches = Some(envelope);
        Ok(())
    }
}
