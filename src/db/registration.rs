use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::query_as;

use crate::error::{AppError, AppResult};
use crate::outbox::JobPayload;
use crate::AppState;

id_struct!(RegistrationId, Registration);

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct Registration {
    pub id: RegistrationId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub dietary_needs: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewRegistration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub dietary_needs: Option<String>,
}

impl AppState {
    /// Persists an attendee registration and queues the receipt notice.
    pub async fn create_registration(&self, data: NewRegistration) -> AppResult<Registration> {
        if data.email.trim().is_empty() {
            return Err(AppError::Validation("email must not be empty".to_string()));
        }

        let mut transaction = self.pool.begin().await?;

        let registration: Registration = query_as(
            "INSERT INTO Registration
                    (first_name, last_name, email, organization, phone, dietary_needs)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            ",
        )
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(data.email.trim())
        .bind(&data.organization)
        .bind(&data.phone)
        .bind(&data.dietary_needs)
        .fetch_one(&mut *transaction)
        .await?;

        Self::enqueue_job(
            &mut transaction,
            &JobPayload::RegistrationReceived {
                registration_id: registration.id,
            },
        )
        .await?;

        transaction.commit().await?;
        self.poke_outbox();

        tracing::info!(registration_id = ?registration.id, "Registration received");

        Ok(registration)
    }

    pub async fn get_registration(&self, id: RegistrationId) -> sqlx::Result<Option<Registration>> {
        query_as("SELECT * FROM Registration WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
}
