use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::database::store::{CallFilter, Store};
use crate::error::{Error, Result};
use crate::models::{
    call::{ApplyOutcome, Call, CallBriefing, CallUpdate, ScreeningQuestion},
    candidate::Candidate,
    connection::{Category, ConnectionRecord},
    correlation::{Correlation, EntityKind},
    job::JobDescription,
};

const UNIQUE_VIOLATION: &str = "23505";
const IN_FLIGHT: &str = "('pending', 'initiated', 'in_progress')";

const CANDIDATE_COLUMNS: &str = "id, full_name, email, phone, current_title, current_company, \
     location, skills, years_of_experience, resume_text, created_at, updated_at";

const JOB_COLUMNS: &str = "id, title, company, description, required_skills, preferred_skills, \
     location, created_at, updated_at";

const CALL_COLUMNS: &str = "id, candidate_id, job_id, status, phone, briefing, questions_asked, \
     provider_conversation_id, provider_call_id, transcript, summary, failure_reason, \
     start_attempt_at, created_at, updated_at";

const CONNECTION_COLUMNS: &str =
    "user_id, category, linked, account_token, integration, last_synced_at, linked_at, updated_at";

#[derive(Debug, FromRow)]
struct CallRow {
    id: Uuid,
    candidate_id: Uuid,
    job_id: Uuid,
    status: String,
    phone: String,
    briefing: Json<CallBriefing>,
    questions_asked: Json<Vec<ScreeningQuestion>>,
    provider_conversation_id: Option<String>,
    provider_call_id: Option<String>,
    transcript: Option<String>,
    summary: Option<String>,
    failure_reason: Option<String>,
    start_attempt_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CallRow> for Call {
    type Error = Error;

    fn try_from(row: CallRow) -> Result<Self> {
        Ok(Call {
            id: row.id,
            candidate_id: row.candidate_id,
            job_id: row.job_id,
            status: row.status.parse().map_err(Error::Internal)?,
            phone: row.phone,
            briefing: row.briefing.0,
            questions_asked: row.questions_asked.0,
            provider_conversation_id: row.provider_conversation_id,
            provider_call_id: row.provider_call_id,
            transcript: row.transcript,
            summary: row.summary,
            failure_reason: row.failure_reason,
            start_attempt_at: row.start_attempt_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ConnectionRow {
    user_id: String,
    category: String,
    linked: bool,
    account_token: Option<String>,
    integration: Option<String>,
    last_synced_at: Option<DateTime<Utc>>,
    linked_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ConnectionRow> for ConnectionRecord {
    type Error = Error;

    fn try_from(row: ConnectionRow) -> Result<Self> {
        Ok(ConnectionRecord {
            user_id: row.user_id,
            category: row.category.parse().map_err(Error::Internal)?,
            linked: row.linked,
            account_token: row.account_token,
            integration: row.integration,
            last_synced_at: row.last_synced_at,
            linked_at: row.linked_at,
            updated_at: row.updated_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn in_flight_call_id<'e, E>(executor: E, column: &str, id: Uuid) -> Result<Option<Uuid>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let sql = format!(
            "SELECT id FROM calls WHERE {} = $1 AND status IN {} ORDER BY created_at LIMIT 1",
            column, IN_FLIGHT
        );
        let existing = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(existing)
    }

    /// Locks the entity row, refuses while calls are in flight, then deletes
    /// the row and its correlations in the same transaction.
    async fn delete_entity(&self, table: &str, column: &str, entity: EntityKind, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>(&format!(
            "SELECT id FROM {} WHERE id = $1 FOR UPDATE",
            table
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Err(Error::NotFound(format!("{} not found", entity)));
        }

        let blocking = Self::in_flight_call_id(&mut *tx, column, id).await?;
        if let Some(call_id) = blocking {
            return Err(Error::conflict(
                format!("{} has a screening call in flight", entity),
                Some(call_id),
            ));
        }

        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM remote_correlations WHERE entity = $1 AND local_id = $2")
            .bind(entity.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_candidate(&self, candidate: &Candidate) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO candidates ({}) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
            CANDIDATE_COLUMNS
        ))
        .bind(candidate.id)
        .bind(&candidate.full_name)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(&candidate.current_title)
        .bind(&candidate.current_company)
        .bind(&candidate.location)
        .bind(&candidate.skills)
        .bind(candidate.years_of_experience)
        .bind(&candidate.resume_text)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_candidate(&self, candidate: &Candidate) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE candidates
            SET full_name = $2, email = $3, phone = $4, current_title = $5,
                current_company = $6, location = $7, skills = $8,
                years_of_experience = $9, resume_text = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.full_name)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(&candidate.current_title)
        .bind(&candidate.current_company)
        .bind(&candidate.location)
        .bind(&candidate.skills)
        .bind(candidate.years_of_experience)
        .bind(&candidate.resume_text)
        .bind(candidate.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Candidate not found".into()));
        }
        Ok(())
    }

    async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>> {
        let candidate = sqlx::query_as::<_, Candidate>(&format!(
            "SELECT {} FROM candidates WHERE id = $1",
            CANDIDATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(candidate)
    }

    async fn list_candidates(&self) -> Result<Vec<Candidate>> {
        let items = sqlx::query_as::<_, Candidate>(&format!(
            "SELECT {} FROM candidates ORDER BY created_at DESC, id DESC",
            CANDIDATE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn delete_candidate(&self, id: Uuid) -> Result<()> {
        self.delete_entity("candidates", "candidate_id", EntityKind::Candidate, id)
            .await
    }

    async fn insert_job(&self, job: &JobDescription) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO jobs ({}) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
            JOB_COLUMNS
        ))
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.description)
        .bind(&job.required_skills)
        .bind(&job.preferred_skills)
        .bind(&job.location)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_job(&self, job: &JobDescription) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET title = $2, company = $3, description = $4, required_skills = $5,
                preferred_skills = $6, location = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.description)
        .bind(&job.required_skills)
        .bind(&job.preferred_skills)
        .bind(&job.location)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Job not found".into()));
        }
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<JobDescription>> {
        let job = sqlx::query_as::<_, JobDescription>(&format!(
            "SELECT {} FROM jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn list_jobs(&self) -> Result<Vec<JobDescription>> {
        let items = sqlx::query_as::<_, JobDescription>(&format!(
            "SELECT {} FROM jobs ORDER BY created_at DESC, id DESC",
            JOB_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn delete_job(&self, id: Uuid) -> Result<()> {
        self.delete_entity("jobs", "job_id", EntityKind::Job, id).await
    }

    async fn create_call(&self, call: &Call) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Shared locks keep a concurrent delete from slipping in between
        // the existence check and the insert.
        let candidate = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM candidates WHERE id = $1 FOR SHARE",
        )
        .bind(call.candidate_id)
        .fetch_optional(&mut *tx)
        .await?;
        if candidate.is_none() {
            return Err(Error::NotFound("Candidate not found".into()));
        }
        let job = sqlx::query_scalar::<_, Uuid>("SELECT id FROM jobs WHERE id = $1 FOR SHARE")
            .bind(call.job_id)
            .fetch_optional(&mut *tx)
            .await?;
        if job.is_none() {
            return Err(Error::NotFound("Job not found".into()));
        }

        let inserted = sqlx::query(&format!(
            "INSERT INTO calls ({}) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)",
            CALL_COLUMNS
        ))
        .bind(call.id)
        .bind(call.candidate_id)
        .bind(call.job_id)
        .bind(call.status.as_str())
        .bind(&call.phone)
        .bind(Json(&call.briefing))
        .bind(Json(&call.questions_asked))
        .bind(&call.provider_conversation_id)
        .bind(&call.provider_call_id)
        .bind(&call.transcript)
        .bind(&call.summary)
        .bind(&call.failure_reason)
        .bind(call.start_attempt_at)
        .bind(call.created_at)
        .bind(call.updated_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {
                tx.commit().await?;
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                let existing = sqlx::query_scalar::<_, Uuid>(&format!(
                    "SELECT id FROM calls WHERE candidate_id = $1 AND job_id = $2 \
                     AND status IN {} ORDER BY created_at LIMIT 1",
                    IN_FLIGHT
                ))
                .bind(call.candidate_id)
                .bind(call.job_id)
                .fetch_optional(&self.pool)
                .await?;
                Err(Error::conflict(
                    "A screening call is already in flight for this candidate and job",
                    existing,
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_call(&self, id: Uuid) -> Result<Option<Call>> {
        let row = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {} FROM calls WHERE id = $1",
            CALL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Call::try_from).transpose()
    }

    async fn find_call_by_conversation(&self, conversation_id: &str) -> Result<Option<Call>> {
        let row = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {} FROM calls WHERE provider_conversation_id = $1 \
             ORDER BY created_at DESC LIMIT 1",
            CALL_COLUMNS
        ))
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Call::try_from).transpose()
    }

    async fn latest_call_to_phone(&self, phone: &str) -> Result<Option<Call>> {
        let row = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {} FROM calls WHERE phone = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
            CALL_COLUMNS
        ))
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Call::try_from).transpose()
    }

    async fn list_calls(&self, filter: &CallFilter) -> Result<Vec<Call>> {
        let rows = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {} FROM calls \
             WHERE ($1::uuid IS NULL OR candidate_id = $1) \
               AND ($2::uuid IS NULL OR job_id = $2) \
               AND ($3::text IS NULL OR status = $3) \
             ORDER BY created_at DESC, id DESC",
            CALL_COLUMNS
        ))
        .bind(filter.candidate_id)
        .bind(filter.job_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Call::try_from).collect()
    }

    async fn apply_call_update(
        &self,
        id: Uuid,
        update: CallUpdate,
    ) -> Result<(Call, ApplyOutcome)> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {} FROM calls WHERE id = $1 FOR UPDATE",
            CALL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Call not found".into()))?;

        let mut call = Call::try_from(row)?;
        let outcome = call.apply(update, Utc::now());

        if !outcome.is_noop() {
            sqlx::query(
                r#"
                UPDATE calls
                SET status = $2, provider_conversation_id = $3, provider_call_id = $4,
                    transcript = $5, summary = $6, failure_reason = $7,
                    start_attempt_at = $8, updated_at = $9
                WHERE id = $1
                "#,
            )
            .bind(call.id)
            .bind(call.status.as_str())
            .bind(&call.provider_conversation_id)
            .bind(&call.provider_call_id)
            .bind(&call.transcript)
            .bind(&call.summary)
            .bind(&call.failure_reason)
            .bind(call.start_attempt_at)
            .bind(call.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok((call, outcome))
    }

    async fn find_correlation(
        &self,
        category: Category,
        entity: EntityKind,
        remote_id: &str,
    ) -> Result<Option<Uuid>> {
        let local_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT local_id FROM remote_correlations \
             WHERE category = $1 AND entity = $2 AND remote_id = $3",
        )
        .bind(category.as_str())
        .bind(entity.as_str())
        .bind(remote_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(local_id)
    }

    async fn find_remote_id(
        &self,
        category: Category,
        entity: EntityKind,
        local_id: Uuid,
    ) -> Result<Option<String>> {
        let remote_id = sqlx::query_scalar::<_, String>(
            "SELECT remote_id FROM remote_correlations \
             WHERE category = $1 AND entity = $2 AND local_id = $3 \
             ORDER BY created_at LIMIT 1",
        )
        .bind(category.as_str())
        .bind(entity.as_str())
        .bind(local_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(remote_id)
    }

    async fn save_correlation(&self, correlation: &Correlation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO remote_correlations (category, entity, remote_id, local_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (category, entity, remote_id)
            DO UPDATE SET local_id = EXCLUDED.local_id
            "#,
        )
        .bind(correlation.category.as_str())
        .bind(correlation.entity.as_str())
        .bind(&correlation.remote_id)
        .bind(correlation.local_id)
        .bind(correlation.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_correlation(
        &self,
        category: Category,
        entity: EntityKind,
        remote_id: &str,
    ) -> Result<()> {
        sqlx::query(
            "DELETE FROM remote_correlations \
             WHERE category = $1 AND entity = $2 AND remote_id = $3",
        )
        .bind(category.as_str())
        .bind(entity.as_str())
        .bind(remote_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_connection(
        &self,
        user_id: &str,
        category: Category,
    ) -> Result<Option<ConnectionRecord>> {
        let row = sqlx::query_as::<_, ConnectionRow>(&format!(
            "SELECT {} FROM connections WHERE user_id = $1 AND category = $2",
            CONNECTION_COLUMNS
        ))
        .bind(user_id)
        .bind(category.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ConnectionRecord::try_from).transpose()
    }

    async fn list_connections(&self, user_id: &str) -> Result<Vec<ConnectionRecord>> {
        let rows = sqlx::query_as::<_, ConnectionRow>(&format!(
            "SELECT {} FROM connections WHERE user_id = $1 ORDER BY category",
            CONNECTION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ConnectionRecord::try_from).collect()
    }

    async fn upsert_connection(&self, record: &ConnectionRecord) -> Result<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO connections ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, category) DO UPDATE SET
                linked = EXCLUDED.linked,
                account_token = EXCLUDED.account_token,
                integration = EXCLUDED.integration,
                last_synced_at = COALESCE(EXCLUDED.last_synced_at, connections.last_synced_at),
                linked_at = EXCLUDED.linked_at,
                updated_at = EXCLUDED.updated_at
            "#,
            CONNECTION_COLUMNS
        ))
        .bind(&record.user_id)
        .bind(record.category.as_str())
        .bind(record.linked)
        .bind(&record.account_token)
        .bind(&record.integration)
        .bind(record.last_synced_at)
        .bind(record.linked_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_unlinked(
        &self,
        user_id: &str,
        category: Category,
        at: DateTime<Utc>,
    ) -> Result<Option<ConnectionRecord>> {
        let row = sqlx::query_as::<_, ConnectionRow>(&format!(
            "UPDATE connections SET linked = FALSE, updated_at = $3 \
             WHERE user_id = $1 AND category = $2 RETURNING {}",
            CONNECTION_COLUMNS
        ))
        .bind(user_id)
        .bind(category.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ConnectionRecord::try_from).transpose()
    }

    async fn mark_synced(
        &self,
        user_id: &str,
        category: Category,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE connections SET last_synced_at = $3, updated_at = $3 \
             WHERE user_id = $1 AND category = $2 AND linked",
        )
        .bind(user_id)
        .bind(category.as_str())
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
