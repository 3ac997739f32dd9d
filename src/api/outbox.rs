use serde::Deserialize;

use crate::db::User;
use crate::error::AppError;
use crate::outbox::{JobId, OutboxJob};
use crate::traits::RequestBody;
use crate::AppState;

/// Staff view of the side-effect queue.
#[derive(Deserialize, Debug)]
pub struct ListOutbox {
    pub status: Option<String>,
}

impl RequestBody for ListOutbox {
    type Response = axum::Json<Vec<OutboxJob>>;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        let user = user.ok_or(AppError::NotLoggedIn)?;
        if !user.role.is_staff() {
            return Err(AppError::NotAuthorized);
        }
        let jobs = state.outbox_jobs(self.status.as_deref()).await?;
        Ok(axum::Json(jobs))
    }
}

/// Requeues a dead job.
#[derive(Deserialize, Debug)]
pub struct RetryOutboxJob {
    pub id: JobId,
}

impl RequestBody for RetryOutboxJob {
    type Response = ();

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        let user = user.ok_or(AppError::NotLoggedIn)?;
        if !user.role.is_staff() {
            return Err(AppError::NotAuthorized);
        }
        state.retry_job(self.id).await?;
        state.poke_outbox();
        Ok(())
    }
}
