//! PostgreSQL profile repository.
//!
//! Rows live in `survey_profiles`; the response, attribute map, quality
//! metrics and match envelope are JSONB columns so the document shapes can
//! evolve without schema changes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use serde_json::Value;
use sqlx::{Pool, Postgres, QueryBuilder, Row};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use kinship_core::{
    Error, MatchEnvelope, NewProfile, ProfileQuery, ProfileRecord, ProfileRepository,
    QualityMetrics, Result, SurveyResponse,
};

const SELECT_COLUMNS: &str =
    "SELECT id, created_at_utc, response, attributes, quality, match_opt_in, matches \
     FROM survey_profiles";

/// PostgreSQL implementation of [`ProfileRepository`].
#[derive(Clone)]
pub struct PgProfileStore {
    pool: Pool<Postgres>,
}

impl PgProfileStore {
    /// Create a new PgProfileStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

/// Keep the finite numeric entries of a stored attribute map.
///
/// Anything else is dropped here so the vector fails its integrity check
/// later and only that candidate is excluded from a ranking run.
fn stored_attributes(value: Value) -> BTreeMap<String, f64> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(k, v)| v.as_f64().filter(|f| f.is_finite()).map(|f| (k, f)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Decode a stored envelope; one written under an incompatible shape reads
/// as absent so the profile is matched again.
fn stored_envelope(id: Uuid, value: Option<Value>) -> Option<MatchEnvelope> {
    let value = value?;
    match serde_json::from_value(value) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            warn!(
                subsystem = "database",
                component = "profiles",
                profile_id = %id,
                error = %e,
                "Stored match envelope unreadable, treating as absent"
            );
            None
        }
    }
}

fn row_to_record(row: &PgRow) -> Result<ProfileRecord> {
    let id: Uuid = row.try_get("id").map_err(Error::Database)?;
    let response: Json<SurveyResponse> = row.try_get("response").map_err(Error::Database)?;
    let attributes: Json<Value> = row.try_get("attributes").map_err(Error::Database)?;
    let quality: Json<QualityMetrics> = row.try_get("quality").map_err(Error::Database)?;
    let matches: Option<Json<Value>> = row.try_get("matches").map_err(Error::Database)?;
    let created_at: DateTime<Utc> = row.try_get("created_at_utc").map_err(Error::Database)?;

    Ok(ProfileRecord {
        id,
        created_at,
        response: response.0,
        attributes: stored_attributes(attributes.0),
        quality: quality.0,
        match_opt_in: row.try_get("match_opt_in").map_err(Error::Database)?,
        matches: stored_envelope(id, matches.map(|m| m.0)),
    })
}

#[async_trait]
impl ProfileRepository for PgProfileStore {
    #[instrument(skip(self, profile), fields(subsystem = "database", component = "profiles"))]
    async fn insert(&self, profile: NewProfile) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO survey_profiles (id, created_at_utc, email, response, attributes, quality, match_opt_in)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(&profile.response.email)
        .bind(Json(&profile.response))
        .bind(Json(profile.vector.to_stored()))
        .bind(Json(profile.quality))
        .bind(profile.match_opt_in)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(profile_id = %id, op = "insert", "Profile stored");
        Ok(id)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<ProfileRecord> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        match row {
            Some(row) => row_to_record(&row),
            None => Err(Error::ProfileNotFound(id)),
        }
    }

    async fn query_by_flags(&self, query: ProfileQuery) -> Result<Vec<ProfileRecord>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_COLUMNS);
        qb.push(" WHERE TRUE");
        if let Some(opt_in) = query.match_opt_in {
            qb.push(" AND match_opt_in = ").push_bind(opt_in);
        }
        match query.has_matches {
            Some(true) => {
                qb.push(" AND matches IS NOT NULL");
            }
            Some(false) => {
                qb.push(" AND matches IS NULL");
            }
            None => {}
        }
        if let Some(before) = query.created_before {
            qb.push(" AND created_at_utc < ").push_bind(before);
        }
        qb.push(" ORDER BY created_at_utc, id");
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "profiles",
            op = "query_by_flags",
            result_count = rows.len(),
            "Profiles selected"
        );
        // A row that cannot be decoded at all is left out of the selection
        Ok(rows
            .iter()
            .filter_map(|row| match row_to_record(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(
                        subsystem = "database",
                        component = "profiles",
                        error = %e,
                        "Skipping undecodable profile row"
                    );
                    None
                }
            })
            .collect())
    }

    async fn attach_matches(&self, id: Uuid, envelope: MatchEnvelope) -> Result<()> {
        let result = sqlx::query("UPDATE survey_profiles SET matches = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(&envelope))
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ProfileNotFound(id));
        }
        Ok(())
    }
}
