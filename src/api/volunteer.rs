use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_typed_multipart::TryFromMultipart;
use serde::Serialize;

use crate::db::{NewVolunteerApplication, User, VolunteerApplicationId};
use crate::error::AppError;
use crate::traits::RequestBody;
use crate::AppState;

/// Public volunteer application form.
#[derive(TryFromMultipart)]
pub struct Volunteer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub availability: Option<String>,
    pub interests: Option<String>,
}

#[derive(Serialize)]
pub struct VolunteerResponse {
    pub id: VolunteerApplicationId,
}

impl RequestBody for Volunteer {
    type Response = VolunteerResponse;

    async fn request(
        self,
        state: AppState,
        _user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        let application = state
            .create_volunteer_application(NewVolunteerApplication {
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                phone: self.phone,
                availability: self.availability,
                interests: self.interests,
            })
            .await?;
        Ok(VolunteerResponse { id: application.id })
    }
}

impl IntoResponse for VolunteerResponse {
    fn into_response(self) -> Response<Body> {
        (StatusCode::CREATED, Json(self)).into_response()
    }
}
