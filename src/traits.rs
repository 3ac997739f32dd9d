use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use axum_extra::extract::CookieJar;
use axum_typed_multipart::{TryFromMultipart, TypedMultipart};
use serde::de::DeserializeOwned;

use crate::db::{TokenStatus, User};
use crate::error::AppError;
use crate::AppState;

const EXPIRED_TOKEN: &str = "token=expired; Expires=Thu, 1 Jan 1970 00:00:00 GMT";
const APPEND_EXPIRED_TOKEN: AppendHeaders<Option<(axum::http::HeaderName, &str)>> =
    AppendHeaders(Some((SET_COOKIE, EXPIRED_TOKEN)));
const APPEND_NO_TOKEN: AppendHeaders<Option<(axum::http::HeaderName, &str)>> = AppendHeaders(None);

type CookieHeaders = AppendHeaders<Option<(axum::http::HeaderName, &'static str)>>;

/// Resolves the request's token cookie to a user, expiring the cookie when
/// the token is stale or unknown.
async fn process_cookies(
    state: &AppState,
    jar: &CookieJar,
) -> Result<(Option<User>, CookieHeaders), AppError> {
    let token = jar.get("token").map(|cookie| cookie.value());
    let token_status = state.token_status(token).await?;
    let cookie_header = match &token_status {
        TokenStatus::None | TokenStatus::Valid(_) => APPEND_NO_TOKEN,
        TokenStatus::Expired | TokenStatus::Unknown => APPEND_EXPIRED_TOKEN,
    };
    let user = match token_status {
        TokenStatus::Valid(user) => Some(user),
        _ => None,
    };
    Ok((user, cookie_header))
}

/// Object that can be linked from an outgoing email.
pub trait Linkable {
    /// Returns the relative URL. Example: `/track?code=ABS-K7Q2ZM4D`
    fn relative_url(&self) -> String;

    /// Returns the absolute URL on the configured public domain.
    fn absolute_url(&self, config: &crate::config::Config) -> String {
        config.domain.clone() + &self.relative_url()
    }
}

/// Object that can be received as a request.
pub trait RequestBody {
    type Response;

    async fn request(self, state: AppState, user: Option<User>)
        -> Result<Self::Response, AppError>;

    async fn as_handler_query(
        State(state): State<AppState>,
        jar: CookieJar,
        Query(item): Query<Self>,
    ) -> Result<impl IntoResponse, AppError>
    where
        Self: Sized + DeserializeOwned,
        Self::Response: IntoResponse,
    {
        let (user, headers) = process_cookies(&state, &jar).await?;
        let response = item.request(state, user).await?;
        Ok((headers, response))
    }

    async fn as_json_handler(
        State(state): State<AppState>,
        jar: CookieJar,
        Json(item): Json<Self>,
    ) -> Result<impl IntoResponse, AppError>
    where
        Self: Sized + DeserializeOwned,
        Self::Response: IntoResponse,
    {
        let (user, headers) = process_cookies(&state, &jar).await?;
        let response = item.request(state, user).await?;
        Ok((headers, response))
    }

    async fn as_multipart_form_handler(
        State(state): State<AppState>,
        jar: CookieJar,
        TypedMultipart(item): TypedMultipart<Self>,
    ) -> Result<impl IntoResponse, AppError>
    where
        Self: Sized + TryFromMultipart,
        Self::Response: IntoResponse,
    {
        let (user, headers) = process_cookies(&state, &jar).await?;
        let response = item.request(state, user).await?;
        Ok((headers, response))
    }
}
