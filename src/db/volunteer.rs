use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::query_as;

use crate::error::{AppError, AppResult};
use crate::outbox::JobPayload;
use crate::AppState;

id_struct!(VolunteerApplicationId, VolunteerApplication);

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct VolunteerApplication {
    pub id: VolunteerApplicationId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub availability: Option<String>,
    pub interests: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewVolunteerApplication {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub availability: Option<String>,
    pub interests: Option<String>,
}

impl AppState {
    /// Persists a volunteer application and queues the receipt notice.
    pub async fn create_volunteer_application(
        &self,
        data: NewVolunteerApplication,
    ) -> AppResult<VolunteerApplication> {
        if data.email.trim().is_empty() {
            return Err(AppError::Validation("email must not be empty".to_string()));
        }

        let mut transaction = self.pool.begin().await?;

        let application: VolunteerApplication = query_as(
            "INSERT INTO VolunteerApplication
                    (first_name, last_name, email, phone, availability, interests)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            ",
        )
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(data.email.trim())
        .bind(&data.phone)
        .bind(&data.availability)
        .bind(&data.interests)
        .fetch_one(&mut *transaction)
        .await?;

        Self::enqueue_job(
            &mut transaction,
            &JobPayload::VolunteerApplicationReceived {
                application_id: application.id,
            },
        )
        .await?;

        transaction.commit().await?;
        self.poke_outbox();

        tracing::info!(application_id = ?application.id, "Volunteer application received");

        Ok(application)
    }

    pub async fn get_volunteer_application(
        &self,
        id: VolunteerApplicationId,
    ) -> sqlx::Result<Option<VolunteerApplication>> {
        query_as("SELECT * FROM VolunteerApplication WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
}
