use serde::Deserialize;

use crate::api::AbstractView;
use crate::db::{AbstractEdits, AbstractId, Status, User};
use crate::error::AppError;
use crate::traits::RequestBody;
use crate::AppState;

/// Partial update to an abstract. Requires authentication; the reviewer
/// assignment and staff notes additionally require a staff role.
#[derive(Deserialize, Debug)]
pub struct UpdateAbstract {
    pub id: AbstractId,
    pub title: Option<String>,
    pub body: Option<String>,
    pub track: Option<String>,
    pub status: Option<Status>,
    pub reviewers: Option<serde_json::Value>,
    pub reviewer_comments: Option<String>,
    pub session_slug: Option<String>,
    pub staff_notes: Option<String>,
}

impl RequestBody for UpdateAbstract {
    type Response = axum::Json<AbstractView>;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        let user = user.ok_or(AppError::NotLoggedIn)?;

        let edits = AbstractEdits {
            title: self.title,
            body: self.body,
            track: self.track,
            status: self.status,
            reviewers: self.reviewers,
            reviewer_comments: self.reviewer_comments,
            session_slug: self.session_slug,
            staff_notes: self.staff_notes,
        };

        let updated = state.update_abstract(self.id, edits, &user).await?;
        Ok(axum::Json(AbstractView::new(updated, user.role)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sqlx::PgPool;

    use crate::db::{Abstract, AbstractEdits, NewAbstract, Role, Status, User};
    use crate::AppState;

    async fn submit(state: &AppState, email: &str) -> Abstract {
        state
            .create_abstract(NewAbstract {
                title: "Strained lattices in thin films".to_string(),
                body: "We study...".to_string(),
                track: None,
                first_name: "Ada".to_string(),
                last_name: "Voss".to_string(),
                email: email.to_string(),
                organization: None,
                phone: None,
                coauthors: None,
                file: None,
            })
            .await
            .unwrap()
    }

    async fn staff_user(state: &AppState) -> User {
        state
            .create_user("editor@example.org", "Eli", "Moreno", Role::Editor)
            .await
            .unwrap()
    }

    fn status_edit(status: Status) -> AbstractEdits {
        AbstractEdits {
            status: Some(status),
            ..Default::default()
        }
    }

    #[sqlx::test]
    async fn status_change_sends_notice_and_noop_update_does_not(pool: PgPool) {
        let state = AppState::for_tests(pool);
        let editor = staff_user(&state).await;
        let abs = submit(&state, "ada@example.org").await;
        state.drain_outbox().await.unwrap(); // receipt

        state
            .update_abstract(abs.id, status_edit(Status::UnderReview), &editor)
            .await
            .unwrap();
        state.drain_outbox().await.unwrap();

        let sent = state.recorded_emails();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].subject.contains("under-review"));

        // Same status again: no new notice.
        state
            .update_abstract(abs.id, status_edit(Status::UnderReview), &editor)
            .await
            .unwrap();
        let edits = AbstractEdits {
            title: Some("Strained lattices, revisited".to_string()),
            ..Default::default()
        };
        state.update_abstract(abs.id, edits, &editor).await.unwrap();
        state.drain_outbox().await.unwrap();
        assert_eq!(state.recorded_emails().len(), 2);
    }

    #[sqlx::test]
    async fn acceptance_provisions_a_linked_presenter_account(pool: PgPool) {
        let state = AppState::for_tests(pool);
        let editor = staff_user(&state).await;
        let abs = submit(&state, "ada@example.org").await;
        state.drain_outbox().await.unwrap();

        state
            .update_abstract(abs.id, status_edit(Status::Accepted), &editor)
            .await
            .unwrap();
        state.drain_outbox().await.unwrap();

        let user = state
            .get_user_from_email("ada@example.org")
            .await
            .unwrap()
            .expect("presenter account");
        assert_eq!(user.role, Role::Presenter);
        assert_eq!(user.created_from_abstract_id, Some(abs.id));
        assert!(user.reset_token.is_some());
        assert!(user.reset_token_expiry.unwrap() > chrono::Utc::now());

        let abs = state.get_abstract(abs.id).await.unwrap();
        assert_eq!(abs.presenter_user_id, Some(user.id));

        // Welcome plus status notice, in that order, after the receipt.
        let sent = state.recorded_emails();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1].subject, "Your presenter account");
        assert!(sent[2].subject.contains("accepted"));
    }

    #[sqlx::test]
    async fn reaccepting_does_not_duplicate_the_account(pool: PgPool) {
        let state = AppState::for_tests(pool);
        let editor = staff_user(&state).await;
        let abs = submit(&state, "ada@example.org").await;

        state
            .update_abstract(abs.id, status_edit(Status::Accepted), &editor)
            .await
            .unwrap();
        state
            .update_abstract(abs.id, status_edit(Status::Revisions), &editor)
            .await
            .unwrap();
        state
            .update_abstract(abs.id, status_edit(Status::Accepted), &editor)
            .await
            .unwrap();
        state.drain_outbox().await.unwrap();

        let user = state
            .get_user_from_email("ada@example.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            state.get_abstract(abs.id).await.unwrap().presenter_user_id,
            Some(user.id)
        );

        // One welcome only, among receipt + three notices.
        let welcomes = state
            .recorded_emails()
            .iter()
            .filter(|e| e.subject == "Your presenter account")
            .count();
        assert_eq!(welcomes, 1);
    }

    #[sqlx::test]
    async fn each_notice_reflects_its_own_transition(pool: PgPool) {
        let state = AppState::for_tests(pool);
        let editor = staff_user(&state).await;
        let abs = submit(&state, "ada@example.org").await;
        state.drain_outbox().await.unwrap();

        // Two rapid changes before the worker gets to either job.
        state
            .update_abstract(abs.id, status_edit(Status::Accepted), &editor)
            .await
            .unwrap();
        state
            .update_abstract(abs.id, status_edit(Status::Revisions), &editor)
            .await
            .unwrap();
        state.drain_outbox().await.unwrap();

        // Receipt, welcome, then one notice per transition.
        let sent = state.recorded_emails();
        let subjects: Vec<&str> = sent.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects.len(), 4);
        assert_eq!(subjects[1], "Your presenter account");
        assert!(subjects[2].contains("accepted"));
        assert!(subjects[3].contains("revisions"));

        // The accept edge happened, so the presenter account exists even
        // though the abstract has since moved on.
        assert!(state
            .get_user_from_email("ada@example.org")
            .await
            .unwrap()
            .is_some());
    }

    #[sqlx::test]
    async fn acceptance_reuses_an_existing_account_without_welcome(pool: PgPool) {
        let state = AppState::for_tests(pool);
        let editor = staff_user(&state).await;
        let existing = state
            .create_user("Ada@Example.org", "Ada", "Voss", Role::Reviewer)
            .await
            .unwrap();
        let abs = submit(&state, "ada@example.org").await;

        state
            .update_abstract(abs.id, status_edit(Status::Accepted), &editor)
            .await
            .unwrap();
        state.drain_outbox().await.unwrap();

        let abs = state.get_abstract(abs.id).await.unwrap();
        assert_eq!(abs.presenter_user_id, Some(existing.id));

        // Role and reset token of the existing account are untouched.
        let user = state.get_user(existing.id).await.unwrap();
        assert_eq!(user.role, Role::Reviewer);
        assert!(user.reset_token.is_none());

        let welcomes = state
            .recorded_emails()
            .iter()
            .filter(|e| e.subject == "Your presenter account")
            .count();
        assert_eq!(welcomes, 0);
    }

    #[sqlx::test]
    async fn reviewer_assignment_is_validated_against_eligible_accounts(pool: PgPool) {
        let state = AppState::for_tests(pool);
        let editor = staff_user(&state).await;
        let reviewer_a = state
            .create_user("a@example.org", "A", "A", Role::Reviewer)
            .await
            .unwrap();
        let reviewer_b = state
            .create_user("b@example.org", "B", "B", Role::Reviewer)
            .await
            .unwrap();
        let speaker = state
            .create_user("s@example.org", "S", "S", Role::Speaker)
            .await
            .unwrap();
        let abs = submit(&state, "ada@example.org").await;

        // Mixed shapes, duplicates, an ineligible account, and junk.
        let edits = AbstractEdits {
            reviewers: Some(json!([
                reviewer_b.id.0,
                {"id": reviewer_a.id.0},
                reviewer_b.id.0.to_string(),
                speaker.id.0,
                "0",
                "nope",
                999,
            ])),
            ..Default::default()
        };
        state.update_abstract(abs.id, edits, &editor).await.unwrap();

        let stored = state.get_abstract_reviewers(abs.id).await.unwrap();
        assert_eq!(stored, vec![reviewer_a.id, reviewer_b.id]);

        // A placeholder clears the assignment.
        let edits = AbstractEdits {
            reviewers: Some(json!("null")),
            ..Default::default()
        };
        state.update_abstract(abs.id, edits, &editor).await.unwrap();
        assert_eq!(state.get_abstract_reviewers(abs.id).await.unwrap(), vec![]);
    }

    #[sqlx::test]
    async fn non_staff_edits_cannot_touch_reviewers_or_notes(pool: PgPool) {
        let state = AppState::for_tests(pool);
        let editor = staff_user(&state).await;
        let reviewer = state
            .create_user("a@example.org", "A", "A", Role::Reviewer)
            .await
            .unwrap();
        let abs = submit(&state, "ada@example.org").await;

        let edits = AbstractEdits {
            reviewers: Some(json!([reviewer.id.0])),
            staff_notes: Some("strong submission".to_string()),
            ..Default::default()
        };
        state.update_abstract(abs.id, edits, &editor).await.unwrap();

        // A reviewer's attempt to rewrite the assignment is dropped, not an
        // error; their other edits still apply.
        let edits = AbstractEdits {
            reviewers: Some(json!([])),
            staff_notes: Some("wiped".to_string()),
            reviewer_comments: Some("Looks solid.".to_string()),
            ..Default::default()
        };
        state.update_abstract(abs.id, edits, &reviewer).await.unwrap();

        let abs = state.get_abstract(abs.id).await.unwrap();
        assert_eq!(abs.staff_notes.as_deref(), Some("strong submission"));
        assert_eq!(abs.reviewer_comments.as_deref(), Some("Looks solid."));
        assert_eq!(
            state.get_abstract_reviewers(abs.id).await.unwrap(),
            vec![reviewer.id]
        );
    }

    #[sqlx::test]
    async fn eligibility_scan_failure_clears_the_assignment(pool: PgPool) {
        let state = AppState::for_tests(pool);
        state
            .create_user("a@example.org", "A", "A", Role::Reviewer)
            .await
            .unwrap();

        state.pool.close().await;

        let sanitized = state.sanitize_reviewer_assignment(&json!([1, 2])).await;
        assert_eq!(sanitized, vec![]);
    }

    #[sqlx::test]
    async fn write_still_commits_when_the_eligibility_scan_fails(pool: PgPool) {
        let state = AppState::for_tests(pool);
        let editor = staff_user(&state).await;
        let reviewer = state
            .create_user("a@example.org", "A", "A", Role::Reviewer)
            .await
            .unwrap();
        let abs = submit(&state, "ada@example.org").await;

        let edits = AbstractEdits {
            reviewers: Some(json!([reviewer.id.0])),
            ..Default::default()
        };
        state.update_abstract(abs.id, edits, &editor).await.unwrap();

        // Break the eligibility scan without touching the abstract tables.
        sqlx::query("ALTER TABLE UserAccount RENAME TO UserAccountGone")
            .execute(&state.pool)
            .await
            .unwrap();

        let edits = AbstractEdits {
            title: Some("Strained lattices, revised".to_string()),
            reviewers: Some(json!([reviewer.id.0])),
            ..Default::default()
        };
        state.update_abstract(abs.id, edits, &editor).await.unwrap();

        let abs = state.get_abstract(abs.id).await.unwrap();
        assert_eq!(abs.title, "Strained lattices, revised");
        assert_eq!(state.get_abstract_reviewers(abs.id).await.unwrap(), vec![]);
    }
}
