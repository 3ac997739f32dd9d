use chrono::{DateTime, TimeDelta, Utc};

use crate::db::user::{User, UserId};
use crate::util;
use crate::AppState;

const TOKEN_DURATION: TimeDelta = TimeDelta::days(365);
const TOKEN_LEN: usize = 64;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Token {
    pub user_id: UserId,
    pub token: String,
    pub expiry: DateTime<Utc>,
}

pub enum TokenStatus {
    /// No token was provided.
    None,
    /// The token is valid and belongs to this user.
    Valid(User),
    /// The token exists but has expired.
    Expired,
    /// The token does not exist.
    Unknown,
}

impl AppState {
    pub async fn token_status(&self, token: Option<&str>) -> sqlx::Result<TokenStatus> {
        let Some(token) = token else {
            return Ok(TokenStatus::None);
        };
        let row: Option<Token> = sqlx::query_as("SELECT * FROM Token WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            None => Ok(TokenStatus::Unknown),
            Some(row) if row.expiry < Utc::now() => Ok(TokenStatus::Expired),
            Some(row) => match self.get_opt_user(row.user_id).await? {
                Some(user) => Ok(TokenStatus::Valid(user)),
                None => Ok(TokenStatus::Unknown),
            },
        }
    }

    pub async fn create_token(&self, user_id: UserId) -> sqlx::Result<Token> {
        sqlx::query_as(
            "INSERT INTO Token (user_id, token, expiry)
                VALUES ($1, $2, $3)
                RETURNING *
            ",
        )
        .bind(user_id)
        .bind(util::random_alnum_string(TOKEN_LEN))
        .bind(Utc::now() + TOKEN_DURATION)
        .fetch_one(&self.pool)
        .await
    }
}
