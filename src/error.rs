use axum::body::Body;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;

pub type AppResult<T = ()> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    SqlError(sqlx::Error),
    Json(serde_json::Error),
    EmailSend(String),
    NotLoggedIn,
    NotAuthorized,
    AbstractDoesNotExist,
    UserDoesNotExist,
    JobDoesNotExist,
    Validation(String),

    Other(String),
}

impl AppError {
    pub fn message(&self) -> String {
        match self {
            Self::SqlError(err) => format!("Internal SQL error: {err}"),
            Self::Json(err) => format!("Invalid JSON payload: {err}"),
            Self::EmailSend(err) => format!("Could not send email: {err}"),
            Self::NotLoggedIn => "Not logged in".to_string(),
            Self::NotAuthorized => "Not authorized".to_string(),
            Self::AbstractDoesNotExist => "Abstract does not exist".to_string(),
            Self::UserDoesNotExist => "User does not exist".to_string(),
            Self::JobDoesNotExist => "Job does not exist".to_string(),
            Self::Validation(msg) => msg.to_string(),

            Self::Other(msg) => msg.to_string(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::SqlError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Json(_) => StatusCode::BAD_REQUEST,
            Self::EmailSend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotLoggedIn => StatusCode::UNAUTHORIZED,
            Self::NotAuthorized => StatusCode::FORBIDDEN,
            Self::AbstractDoesNotExist => StatusCode::NOT_FOUND,
            Self::UserDoesNotExist => StatusCode::NOT_FOUND,
            Self::JobDoesNotExist => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,

            Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response<Body> {
        (self.status_code(), self.message()).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> AppError {
        AppError::SqlError(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> AppError {
        AppError::Json(err)
    }
}

impl From<mail_send::Error> for AppError {
    fn from(err: mail_send::Error) -> AppError {
        AppError::EmailSend(err.to_string())
    }
}
