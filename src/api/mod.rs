pub mod list_abstracts;
pub mod outbox;
pub mod register;
pub mod submit_abstract;
pub mod track;
pub mod update_abstract;
pub mod volunteer;

use serde::Serialize;

use crate::db::{Abstract, Role, Status, Track, UserId};

/// An abstract as shown to an authenticated viewer. Staff-only notes are
/// stripped for everyone else.
#[derive(Serialize, Debug)]
pub struct AbstractView {
    pub id: crate::db::AbstractId,
    pub submission_code: String,
    pub title: String,
    pub track: Track,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub organization: Option<String>,
    pub coauthors: Option<String>,
    pub has_file: bool,
    pub status: Status,
    pub reviewer_comments: Option<String>,
    pub session_slug: Option<String>,
    pub staff_notes: Option<String>,
    pub presenter_user_id: Option<UserId>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl AbstractView {
    pub fn new(abs: Abstract, viewer_role: Role) -> Self {
        Self {
            id: abs.id,
            submission_code: abs.submission_code,
            title: abs.title,
            track: abs.track,
            first_name: abs.first_name,
            last_name: abs.last_name,
            email: abs.email,
            organization: abs.organization,
            coauthors: abs.coauthors,
            has_file: abs.has_file,
            status: abs.status,
            reviewer_comments: abs.reviewer_comments,
            session_slug: abs.session_slug,
            staff_notes: viewer_role.is_staff().then_some(abs.staff_notes).flatten(),
            presenter_user_id: abs.presenter_user_id,
            submitted_at: abs.submitted_at,
            updated_at: abs.updated_at,
        }
    }
}
