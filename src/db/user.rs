use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sqlx::query_as;

use crate::db::abstracts::{Abstract, AbstractId};
use crate::error::{AppError, AppResult};
use crate::util;
use crate::AppState;

/// How long a password-reset token stays valid.
const RESET_TOKEN_DURATION: TimeDelta = TimeDelta::hours(24);
/// Number of characters in a password-reset token.
const RESET_TOKEN_LEN: usize = 48;

id_struct!(UserId, User);

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    Editor,
    Contributor,
    Speaker,
    Presenter,
    Volunteer,
    Reviewer,
}

impl Role {
    /// Staff may edit any abstract field, including the reviewer assignment
    /// and staff-only notes.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Editor)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Contributor => "contributor",
            Role::Speaker => "speaker",
            Role::Presenter => "presenter",
            Role::Volunteer => "volunteer",
            Role::Reviewer => "reviewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "contributor" => Ok(Role::Contributor),
            "speaker" => Ok(Role::Speaker),
            "presenter" => Ok(Role::Presenter),
            "volunteer" => Ok(Role::Volunteer),
            "reviewer" => Ok(Role::Reviewer),
            other => Err(AppError::Validation(format!("unknown role {other:?}"))),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub password_hash: String,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub created_from_abstract_id: Option<AbstractId>,
    pub created_at: DateTime<Utc>,
}

impl AppState {
    pub async fn get_opt_user(&self, id: UserId) -> sqlx::Result<Option<User>> {
        query_as("SELECT * FROM UserAccount WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_user(&self, id: UserId) -> AppResult<User> {
        self.get_opt_user(id).await?.ok_or(AppError::UserDoesNotExist)
    }

    /// Case-insensitive, trimmed email lookup, limited to one result.
    pub async fn get_user_from_email(&self, email: &str) -> sqlx::Result<Option<User>> {
        query_as("SELECT * FROM UserAccount WHERE lower(email) = $1 LIMIT 1")
            .bind(util::canonical_email(email))
            .fetch_optional(&self.pool)
            .await
    }

    /// Creates a user account directly (CLI surface).
    pub async fn create_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        role: Role,
    ) -> sqlx::Result<User> {
        query_as(
            "INSERT INTO UserAccount (email, first_name, last_name, role, password_hash)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            ",
        )
        .bind(email.trim())
        .bind(first_name)
        .bind(last_name)
        .bind(role)
        .bind(util::random_password_hash())
        .fetch_one(&self.pool)
        .await
    }

    /// The authoritative set of user ids that may hold reviewer assignments:
    /// every account whose role is reviewer, admin, or editor.
    ///
    /// Runs on the server pool, so the result is independent of any caller's
    /// row-level visibility.
    pub async fn eligible_reviewer_ids(&self) -> sqlx::Result<Vec<UserId>> {
        sqlx::query_scalar(
            "SELECT id FROM UserAccount
                WHERE role IN ('reviewer', 'admin', 'editor')
                ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Finds the user account for an abstract's author email, creating a
    /// presenter account when none exists. The insert is keyed on the unique
    /// `lower(email)` index, so two concurrent calls cannot both create.
    ///
    /// Returns the account and whether this call created it.
    pub async fn find_or_create_presenter(&self, abs: &Abstract) -> AppResult<(User, bool)> {
        let created: Option<User> = query_as(
            "INSERT INTO UserAccount
                    (email, first_name, last_name, organization, phone,
                    role, password_hash, created_from_abstract_id)
                VALUES ($1, $2, $3, $4, $5, 'presenter', $6, $7)
                ON CONFLICT ((lower(email))) DO NOTHING
                RETURNING *
            ",
        )
        .bind(abs.email.trim())
        .bind(&abs.first_name)
        .bind(&abs.last_name)
        .bind(&abs.organization)
        .bind(&abs.phone)
        .bind(util::random_password_hash())
        .bind(abs.id)
        .fetch_optional(&self.pool)
        .await?;

        match created {
            Some(user) => {
                tracing::info!(user_id = ?user.id, abstract_id = ?abs.id, "Provisioned presenter account");
                Ok((user, true))
            }
            None => {
                let user = self
                    .get_user_from_email(&abs.email)
                    .await?
                    .ok_or(AppError::UserDoesNotExist)?;
                Ok((user, false))
            }
        }
    }

    /// Generates and persists a password-reset token for a user.
    pub async fn create_reset_token(&self, user_id: UserId) -> sqlx::Result<String> {
        let token = util::random_alnum_string(RESET_TOKEN_LEN);
        let expiry = Utc::now() + RESET_TOKEN_DURATION;

        sqlx::query(
            "UPDATE UserAccount SET reset_token = $1, reset_token_expiry = $2 WHERE id = $3",
        )
        .bind(&token)
        .bind(expiry)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(token)
    }
}
