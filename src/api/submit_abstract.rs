use axum::body::{Body, Bytes};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::Serialize;

use crate::db::{NewAbstract, User};
use crate::error::AppError;
use crate::traits::RequestBody;
use crate::AppState;

/// Public submission form. No authentication required.
#[derive(TryFromMultipart)]
pub struct SubmitAbstract {
    pub title: String,
    pub body: String,
    pub track: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub coauthors: Option<String>,
    #[form_data(limit = "10MiB")]
    pub file: Option<FieldData<Bytes>>,
}

#[derive(Serialize)]
pub struct SubmitAbstractResponse {
    pub submission_code: String,
}

impl RequestBody for SubmitAbstract {
    type Response = SubmitAbstractResponse;

    async fn request(
        self,
        state: AppState,
        _user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        let file = self.file.map(|f| {
            let name = f
                .metadata
                .file_name
                .unwrap_or_else(|| "attachment".to_string());
            (name, f.contents.to_vec())
        });

        let abs = state
            .create_abstract(NewAbstract {
                title: self.title,
                body: self.body,
                track: self.track,
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                organization: self.organization,
                phone: self.phone,
                coauthors: self.coauthors,
                file,
            })
            .await?;

        Ok(SubmitAbstractResponse {
            submission_code: abs.submission_code,
        })
    }
}

impl IntoResponse for SubmitAbstractResponse {
    fn into_response(self) -> Response<Body> {
        (StatusCode::CREATED, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use crate::db::{NewAbstract, Status, Track};
    use crate::AppState;

    fn sample_submission() -> NewAbstract {
        NewAbstract {
            title: "Strained lattices in thin films".to_string(),
            body: "We study...".to_string(),
            track: None,
            first_name: "Ada".to_string(),
            last_name: "Voss".to_string(),
            email: "ada@example.org".to_string(),
            organization: Some("Example University".to_string()),
            phone: None,
            coauthors: None,
            file: Some(("slides.pdf".to_string(), vec![0x25, 0x50, 0x44, 0x46])),
        }
    }

    #[sqlx::test]
    async fn submission_stores_defaults_and_sends_receipt(pool: PgPool) {
        let state = AppState::for_tests(pool);

        let abs = state.create_abstract(sample_submission()).await.unwrap();
        assert_eq!(abs.status, Status::Received);
        assert_eq!(abs.track, Track::Research);
        assert!(abs.submission_code.starts_with("ABS-"));
        assert!(abs.has_file);

        state.drain_outbox().await.unwrap();

        let sent = state.recorded_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ada@example.org");
        assert!(sent[0].subject.contains(&abs.submission_code));
        assert!(sent[0].text_body.contains(&abs.title));
    }

    #[sqlx::test]
    async fn unknown_track_is_ignored_not_rejected(pool: PgPool) {
        let state = AppState::for_tests(pool);

        let mut data = sample_submission();
        data.track = Some("plenary".to_string());
        let abs = state.create_abstract(data).await.unwrap();
        assert_eq!(abs.track, Track::Research);
    }

    #[sqlx::test]
    async fn blank_title_is_rejected(pool: PgPool) {
        let state = AppState::for_tests(pool);

        let mut data = sample_submission();
        data.title = "  ".to_string();
        assert!(state.create_abstract(data).await.is_err());
    }
}
