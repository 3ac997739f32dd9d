use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Status, Track, User};
use crate::error::AppError;
use crate::traits::RequestBody;
use crate::AppState;

/// Public tracking lookup. Requires both the submission code and the email
/// the abstract was submitted with, so a leaked code alone reveals nothing.
#[derive(Deserialize, Debug)]
pub struct TrackAbstract {
    pub code: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct TrackAbstractResponse {
    pub submission_code: String,
    pub title: String,
    pub track: Track,
    pub status: Status,
    pub reviewer_comments: Option<String>,
    pub session_slug: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RequestBody for TrackAbstract {
    type Response = axum::Json<TrackAbstractResponse>;

    async fn request(
        self,
        state: AppState,
        _user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        let abs = state
            .get_abstract_by_code(&self.code, &self.email)
            .await?
            .ok_or(AppError::AbstractDoesNotExist)?;

        // Comments shown to the author follow the same rule as the status
        // notices: only once a decision carries them.
        let reviewer_comments = abs
            .reviewer_comments
            .filter(|_| abs.status.notice_includes_comments());

        Ok(axum::Json(TrackAbstractResponse {
            submission_code: abs.submission_code,
            title: abs.title,
            track: abs.track,
            status: abs.status,
            reviewer_comments,
            session_slug: abs.session_slug,
            submitted_at: abs.submitted_at,
            updated_at: abs.updated_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use crate::db::NewAbstract;
    use crate::AppState;

    #[sqlx::test]
    async fn lookup_requires_matching_code_and_email(pool: PgPool) {
        let state = AppState::for_tests(pool);
        let abs = state
            .create_abstract(NewAbstract {
                title: "Strained lattices".to_string(),
                body: "...".to_string(),
                track: None,
                first_name: "Ada".to_string(),
                last_name: "Voss".to_string(),
                email: "ada@example.org".to_string(),
                organization: None,
                phone: None,
                coauthors: None,
                file: None,
            })
            .await
            .unwrap();

        let found = state
            .get_abstract_by_code(&abs.submission_code, " Ada@Example.ORG ")
            .await
            .unwrap();
        assert!(found.is_some());

        let wrong_email = state
            .get_abstract_by_code(&abs.submission_code, "other@example.org")
            .await
            .unwrap();
        assert!(wrong_email.is_none());

        let wrong_code = state
            .get_abstract_by_code("ABS-XXXXXXXX", "ada@example.org")
            .await
            .unwrap();
        assert!(wrong_code.is_none());
    }
}
