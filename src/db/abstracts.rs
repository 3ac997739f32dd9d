use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::query_as;

use crate::db::user::{Role, User, UserId};
use crate::error::{AppError, AppResult};
use crate::outbox::JobPayload;
use crate::traits::Linkable;
use crate::util;
use crate::AppState;

id_struct!(AbstractId, Abstract);

/// Column list for reading abstracts. `file_contents` may be large, so it is
/// never selected; `has_file` reports whether it is present.
const ABSTRACT_COLS: &str = "id, submission_code, title, body, track, \
    first_name, last_name, email, organization, phone, coauthors, \
    file_name, (file_contents IS NOT NULL) AS has_file, \
    status, reviewer_comments, session_slug, staff_notes, \
    presenter_user_id, submitted_at, updated_at";

/// Review status of an abstract. Not a strict pipeline: any authenticated
/// actor may move an abstract to any status.
#[derive(sqlx::Type, Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[sqlx(type_name = "abstract_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Received,
    UnderReview,
    Revisions,
    Accepted,
    Rejected,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Received => "received",
            Status::UnderReview => "under-review",
            Status::Revisions => "revisions",
            Status::Accepted => "accepted",
            Status::Rejected => "rejected",
        }
    }

    /// Whether a status notice for this status carries the reviewer comments.
    pub fn notice_includes_comments(self) -> bool {
        matches!(self, Status::Revisions | Status::Rejected | Status::Accepted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[sqlx(type_name = "abstract_track", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Track {
    Research,
    Industry,
    Workshop,
    Poster,
}

impl Track {
    /// Track assigned on creation when the client sends none.
    pub const DEFAULT: Track = Track::Research;

    pub fn as_str(self) -> &'static str {
        match self {
            Track::Research => "research",
            Track::Industry => "industry",
            Track::Workshop => "workshop",
            Track::Poster => "poster",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Track {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "research" => Ok(Track::Research),
            "industry" => Ok(Track::Industry),
            "workshop" => Ok(Track::Workshop),
            "poster" => Ok(Track::Poster),
            _ => Err(()),
        }
    }
}

/// Resolves a client-supplied track value. Missing or unknown values fall
/// back to `fallback` (the stored value on update, [`Track::DEFAULT`] on
/// create); the rejected input is logged so a misbehaving client is visible.
pub fn resolve_track(input: Option<&str>, fallback: Track) -> Track {
    match input.map(str::trim) {
        None | Some("") => fallback,
        Some(s) => match s.parse() {
            Ok(track) => track,
            Err(()) => {
                tracing::warn!(track = s, "Ignoring unknown track value");
                fallback
            }
        },
    }
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct Abstract {
    pub id: AbstractId,
    /// Public tracking code, generated once at submission, immutable.
    pub submission_code: String,

    pub title: String,
    pub body: String,
    pub track: Track,

    // Author contact block, owned by the abstract.
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub coauthors: Option<String>,

    pub file_name: Option<String>,
    /// Whether `file_contents` is non-NULL. The bytes are never selected
    /// alongside the rest of the record.
    pub has_file: bool,

    pub status: Status,
    pub reviewer_comments: Option<String>,
    /// Program session the abstract is scheduled into, meaningful once
    /// accepted. Free text; session CRUD lives elsewhere.
    pub session_slug: Option<String>,
    pub staff_notes: Option<String>,
    pub presenter_user_id: Option<UserId>,

    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Linkable for Abstract {
    fn relative_url(&self) -> String {
        format!("/track?code={}", self.submission_code)
    }
}

/// Fields accepted from the public submission form.
#[derive(Debug)]
pub struct NewAbstract {
    pub title: String,
    pub body: String,
    pub track: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub coauthors: Option<String>,
    pub file: Option<(String, Vec<u8>)>,
}

/// Partial update to an abstract. `None` leaves the stored value unchanged.
#[derive(Debug, Default)]
pub struct AbstractEdits {
    pub title: Option<String>,
    pub body: Option<String>,
    pub track: Option<String>,
    pub status: Option<Status>,
    /// Proposed reviewer assignment, in whatever shape the client sent.
    pub reviewers: Option<serde_json::Value>,
    pub reviewer_comments: Option<String>,
    pub session_slug: Option<String>,
    pub staff_notes: Option<String>,
}

impl AbstractEdits {
    /// Removes fields that cannot be set by the given role. The reviewer
    /// assignment and staff notes are staff-only; dropping them silently
    /// mirrors how ineligible ids are dropped rather than rejected.
    pub fn filter_for_role(&mut self, role: Role) {
        if !role.is_staff() {
            self.reviewers = None;
            self.staff_notes = None;
        }
    }
}

impl AppState {
    pub async fn get_opt_abstract(&self, id: AbstractId) -> sqlx::Result<Option<Abstract>> {
        let sql = format!("SELECT {ABSTRACT_COLS} FROM Abstract WHERE id = $1");
        query_as(&sql).bind(id).fetch_optional(&self.pool).await
    }

    pub async fn get_abstract(&self, id: AbstractId) -> AppResult<Abstract> {
        self.get_opt_abstract(id)
            .await?
            .ok_or(AppError::AbstractDoesNotExist)
    }

    /// Public tracking lookup: submission code plus the author's email.
    pub async fn get_abstract_by_code(
        &self,
        code: &str,
        email: &str,
    ) -> sqlx::Result<Option<Abstract>> {
        let sql = format!(
            "SELECT {ABSTRACT_COLS} FROM Abstract
                WHERE submission_code = $1 AND lower(email) = $2
            "
        );
        query_as(&sql)
            .bind(code.trim())
            .bind(util::canonical_email(email))
            .fetch_optional(&self.pool)
            .await
    }

    /// The persisted reviewer assignment for an abstract.
    pub async fn get_abstract_reviewers(&self, id: AbstractId) -> sqlx::Result<Vec<UserId>> {
        sqlx::query_scalar(
            "SELECT reviewer_id FROM AbstractReviewer
                WHERE abstract_id = $1
                ORDER BY reviewer_id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
    }

    /// Lists abstracts visible to `viewer`: staff see everything (optionally
    /// filtered by status), reviewers see only abstracts assigned to them.
    pub async fn list_abstracts(
        &self,
        viewer: &User,
        status: Option<Status>,
    ) -> AppResult<Vec<Abstract>> {
        if viewer.role.is_staff() {
            let sql = format!(
                "SELECT {ABSTRACT_COLS} FROM Abstract
                    WHERE ($1::abstract_status IS NULL OR status = $1)
                    ORDER BY submitted_at DESC
                "
            );
            Ok(query_as(&sql).bind(status).fetch_all(&self.pool).await?)
        } else if viewer.role == Role::Reviewer {
            let sql = format!(
                "SELECT {ABSTRACT_COLS} FROM Abstract
                    JOIN AbstractReviewer ON AbstractReviewer.abstract_id = Abstract.id
                    WHERE AbstractReviewer.reviewer_id = $1
                        AND ($2::abstract_status IS NULL OR status = $2)
                    ORDER BY submitted_at DESC
                "
            );
            Ok(query_as(&sql)
                .bind(viewer.id)
                .bind(status)
                .fetch_all(&self.pool)
                .await?)
        } else {
            Err(AppError::NotAuthorized)
        }
    }

    /// Persists a public submission and queues the receipt notice in the
    /// same transaction.
    pub async fn create_abstract(&self, data: NewAbstract) -> AppResult<Abstract> {
        if data.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        if data.body.trim().is_empty() {
            return Err(AppError::Validation(
                "abstract body must not be empty".to_string(),
            ));
        }
        if data.email.trim().is_empty() {
            return Err(AppError::Validation("email must not be empty".to_string()));
        }

        let track = resolve_track(data.track.as_deref(), Track::DEFAULT);
        let submission_code = util::new_submission_code();
        let (file_name, file_contents) = data.file.unzip();

        let mut transaction = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO Abstract
                    (submission_code, title, body, track,
                    first_name, last_name, email, organization, phone, coauthors,
                    file_name, file_contents)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                RETURNING {ABSTRACT_COLS}
            "
        );
        let abs: Abstract = query_as(&sql)
            .bind(&submission_code)
            .bind(data.title.trim())
            .bind(&data.body)
            .bind(track)
            .bind(&data.first_name)
            .bind(&data.last_name)
            .bind(data.email.trim())
            .bind(&data.organization)
            .bind(&data.phone)
            .bind(&data.coauthors)
            .bind(&file_name)
            .bind(&file_contents)
            .fetch_one(&mut *transaction)
            .await?;

        Self::enqueue_job(
            &mut transaction,
            &JobPayload::SubmissionReceived { abstract_id: abs.id },
        )
        .await?;

        transaction.commit().await?;
        self.poke_outbox();

        tracing::info!(abstract_id = ?abs.id, code = %abs.submission_code, "Abstract submitted");

        Ok(abs)
    }

    /// Applies a partial update. Runs the reviewer-set sanitizer over any
    /// proposed assignment and queues status-change side effects in the same
    /// transaction as the write.
    pub async fn update_abstract(
        &self,
        id: AbstractId,
        mut edits: AbstractEdits,
        editor: &User,
    ) -> AppResult<Abstract> {
        let old = self.get_abstract(id).await?;
        edits.filter_for_role(editor.role);

        let track = resolve_track(edits.track.as_deref(), old.track);

        // Sanitized before the transaction opens: a failed eligibility fetch
        // degrades to an empty assignment, never a failed write.
        let reviewers = match &edits.reviewers {
            Some(proposed) => Some(self.sanitize_reviewer_assignment(proposed).await),
            None => None,
        };

        let mut transaction = self.pool.begin().await?;

        let sql = format!(
            "UPDATE Abstract
                SET title = COALESCE($2, title),
                    body = COALESCE($3, body),
                    track = $4,
                    status = COALESCE($5, status),
                    reviewer_comments = COALESCE($6, reviewer_comments),
                    session_slug = COALESCE($7, session_slug),
                    staff_notes = COALESCE($8, staff_notes),
                    updated_at = now()
                WHERE id = $1
                RETURNING {ABSTRACT_COLS}
            "
        );
        let new: Abstract = query_as(&sql)
            .bind(id)
            .bind(&edits.title)
            .bind(&edits.body)
            .bind(track)
            .bind(edits.status)
            .bind(&edits.reviewer_comments)
            .bind(&edits.session_slug)
            .bind(&edits.staff_notes)
            .fetch_one(&mut *transaction)
            .await?;

        if let Some(reviewer_ids) = &reviewers {
            let reviewer_ids = crate::sanitize::guard_assignment(reviewer_ids);
            sqlx::query("DELETE FROM AbstractReviewer WHERE abstract_id = $1")
                .bind(id)
                .execute(&mut *transaction)
                .await?;
            sqlx::query(
                "INSERT INTO AbstractReviewer (abstract_id, reviewer_id)
                    SELECT $1, unnest($2::int4[])
                ",
            )
            .bind(id)
            .bind(reviewer_ids.iter().map(|id| id.0).collect::<Vec<i32>>())
            .execute(&mut *transaction)
            .await?;
        }

        if new.status != old.status {
            Self::enqueue_job(
                &mut transaction,
                &JobPayload::StatusChanged {
                    abstract_id: id,
                    previous: old.status,
                    current: new.status,
                },
            )
            .await?;
        }

        transaction.commit().await?;
        self.poke_outbox();

        tracing::info!(
            editor_id = ?editor.id,
            abstract_id = ?id,
            status = %new.status,
            "Abstract updated"
        );

        Ok(new)
    }

    /// Points an abstract at its presenter account.
    pub async fn link_presenter(
        &self,
        abstract_id: AbstractId,
        user_id: UserId,
    ) -> sqlx::Result<()> {
        sqlx::query("UPDATE Abstract SET presenter_user_id = $1 WHERE id = $2")
            .bind(user_id)
            .bind(abstract_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_track_falls_back() {
        assert_eq!(resolve_track(Some("research"), Track::Poster), Track::Research);
        assert_eq!(resolve_track(Some("plenary"), Track::Poster), Track::Poster);
        assert_eq!(resolve_track(Some(""), Track::Workshop), Track::Workshop);
        assert_eq!(resolve_track(None, Track::DEFAULT), Track::Research);
    }
}
