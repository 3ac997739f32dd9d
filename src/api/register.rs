use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_typed_multipart::TryFromMultipart;
use serde::Serialize;

use crate::db::{NewRegistration, RegistrationId, User};
use crate::error::AppError;
use crate::traits::RequestBody;
use crate::AppState;

/// Public attendee registration form.
#[derive(TryFromMultipart)]
pub struct Register {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub dietary_needs: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: RegistrationId,
}

impl RequestBody for Register {
    type Response = RegisterResponse;

    async fn request(
        self,
        state: AppState,
        _user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        let registration = state
            .create_registration(NewRegistration {
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                organization: self.organization,
                phone: self.phone,
                dietary_needs: self.dietary_needs,
            })
            .await?;
        Ok(RegisterResponse {
            id: registration.id,
        })
    }
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response<Body> {
        (StatusCode::CREATED, Json(self)).into_response()
    }
}
