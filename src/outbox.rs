//! Durable side-effect queue.
//!
//! Status changes and receipt notices are recorded as jobs in the same
//! transaction as the database write that caused them, then executed by a
//! background worker. A crash between commit and delivery loses nothing;
//! the job is simply picked up again.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sqlx::query_as;

use crate::db::{AbstractId, RegistrationId, Status, VolunteerApplicationId};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Attempts before a job is parked as dead.
const MAX_ATTEMPTS: i32 = 5;
/// How often the worker polls when idle.
const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

id_struct!(JobId, OutboxJob);

/// Work recorded for the background worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    SubmissionReceived {
        abstract_id: AbstractId,
    },
    StatusChanged {
        abstract_id: AbstractId,
        previous: Status,
        current: Status,
    },
    RegistrationReceived {
        registration_id: RegistrationId,
    },
    VolunteerApplicationReceived {
        application_id: VolunteerApplicationId,
    },
}

impl JobPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            JobPayload::SubmissionReceived { .. } => "submission_received",
            JobPayload::StatusChanged { .. } => "status_changed",
            JobPayload::RegistrationReceived { .. } => "registration_received",
            JobPayload::VolunteerApplicationReceived { .. } => "volunteer_application_received",
        }
    }
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct OutboxJob {
    pub id: JobId,
    pub kind: String,
    pub payload: serde_json::Value,
    /// `pending`, `done`, or `dead`.
    pub status: String,
    pub attempts: i32,
    pub next_attempt: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Delay before retrying a job that has failed `attempts` times.
fn backoff(attempts: i32) -> TimeDelta {
    TimeDelta::seconds(30 * (1_i64 << attempts.clamp(0, 6)))
}

impl AppState {
    /// Records a job inside the caller's transaction, so the job exists if
    /// and only if the write it belongs to commits.
    pub(crate) async fn enqueue_job(
        transaction: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        payload: &JobPayload,
    ) -> AppResult {
        sqlx::query("INSERT INTO OutboxJob (kind, payload) VALUES ($1, $2)")
            .bind(payload.kind())
            .bind(serde_json::to_value(payload)?)
            .execute(&mut **transaction)
            .await?;
        Ok(())
    }

    /// Claims and executes the next due job. Returns whether a job was
    /// claimed, so the worker can drain the queue before sleeping.
    pub async fn run_next_job(&self) -> AppResult<bool> {
        let mut transaction = self.pool.begin().await?;

        let job: Option<OutboxJob> = query_as(
            "SELECT * FROM OutboxJob
                WHERE status = 'pending' AND next_attempt <= now()
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            ",
        )
        .fetch_optional(&mut *transaction)
        .await?;
        let Some(job) = job else {
            return Ok(false);
        };

        let result = match serde_json::from_value::<JobPayload>(job.payload.clone()) {
            Ok(payload) => self.execute_job(&payload).await,
            Err(error) => Err(error.into()),
        };

        match result {
            Ok(()) => {
                sqlx::query("UPDATE OutboxJob SET status = 'done', last_error = NULL WHERE id = $1")
                    .bind(job.id)
                    .execute(&mut *transaction)
                    .await?;
            }
            Err(error) => {
                let attempts = job.attempts + 1;
                let status = if attempts >= MAX_ATTEMPTS { "dead" } else { "pending" };
                tracing::warn!(job_id = ?job.id, kind = %job.kind, attempts, %error, "Outbox job failed");
                sqlx::query(
                    "UPDATE OutboxJob
                        SET status = $2, attempts = $3, next_attempt = $4, last_error = $5
                        WHERE id = $1
                    ",
                )
                .bind(job.id)
                .bind(status)
                .bind(attempts)
                .bind(Utc::now() + backoff(attempts))
                .bind(error.to_string())
                .execute(&mut *transaction)
                .await?;
            }
        }

        transaction.commit().await?;
        Ok(true)
    }

    async fn execute_job(&self, payload: &JobPayload) -> AppResult {
        match payload {
            JobPayload::SubmissionReceived { abstract_id } => {
                let abs = self.get_abstract(*abstract_id).await?;
                self.send_submission_received(&abs).await
            }
            JobPayload::StatusChanged {
                abstract_id,
                previous,
                current,
            } => {
                // The notice reflects the recorded transition, not whatever
                // status the abstract has moved on to since.
                let mut abs = self.get_abstract(*abstract_id).await?;
                abs.status = *current;
                // Provisioning runs before the notice, so an acceptance email
                // never goes out without the presenter account behind it.
                if *current == Status::Accepted && *previous != Status::Accepted {
                    self.provision_presenter(&abs).await?;
                }
                self.send_status_notice(&abs).await
            }
            JobPayload::RegistrationReceived { registration_id } => {
                let registration = self
                    .get_registration(*registration_id)
                    .await?
                    .ok_or_else(|| AppError::Other("registration no longer exists".to_string()))?;
                self.send_registration_received(&registration).await
            }
            JobPayload::VolunteerApplicationReceived { application_id } => {
                let application = self
                    .get_volunteer_application(*application_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Other("volunteer application no longer exists".to_string())
                    })?;
                self.send_volunteer_received(&application).await
            }
        }
    }

    /// Runs jobs until the queue is idle, then waits for a poke or the next
    /// poll tick. Never returns.
    pub async fn run_outbox_worker(self) {
        tracing::info!("Outbox worker started");
        loop {
            match self.run_next_job().await {
                Ok(true) => continue,
                Ok(false) => (),
                Err(error) => tracing::error!(?error, "Outbox worker error"),
            }
            tokio::select! {
                _ = self.outbox_notify.notified() => (),
                _ = tokio::time::sleep(POLL_INTERVAL) => (),
            }
        }
    }

    /// Lists jobs, optionally filtered by status (staff surface).
    pub async fn outbox_jobs(&self, status: Option<&str>) -> sqlx::Result<Vec<OutboxJob>> {
        query_as(
            "SELECT * FROM OutboxJob
                WHERE $1::text IS NULL OR status = $1
                ORDER BY id DESC
            ",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
    }

    /// Puts a dead job back in the queue with a fresh attempt budget.
    pub async fn retry_job(&self, id: JobId) -> AppResult {
        let result = sqlx::query(
            "UPDATE OutboxJob
                SET status = 'pending', attempts = 0, next_attempt = now()
                WHERE id = $1 AND status = 'dead'
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::JobDoesNotExist);
        }
        tracing::info!(job_id = ?id, "Dead job requeued");
        Ok(())
    }

    /// Makes every pending job immediately due, regardless of backoff.
    #[cfg(test)]
    pub async fn force_jobs_due(&self) -> sqlx::Result<()> {
        sqlx::query("UPDATE OutboxJob SET next_attempt = now() WHERE status = 'pending'")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Runs jobs until the queue is idle (test helper).
    #[cfg(test)]
    pub async fn drain_outbox(&self) -> AppResult {
        while self.run_next_job().await? {}
        Ok(())
    }
}
