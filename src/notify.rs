//! Composition and delivery of transactional email.

use crate::config::Config;
use crate::db::{Abstract, Registration, User, VolunteerApplication};
use crate::email::OutgoingEmail;
use crate::error::AppResult;
use crate::traits::Linkable;
use crate::AppState;

fn received_email(config: &Config, abs: &Abstract) -> OutgoingEmail {
    let tracking_url = abs.absolute_url(config);
    OutgoingEmail {
        to: abs.email.clone(),
        subject: format!("Abstract received: {}", abs.submission_code),
        text_body: format!(
            "Dear {},\n\n\
            We have received your abstract \"{}\".\n\n\
            Your submission code is {}. You can follow the review progress \
            at any time here:\n\n{tracking_url}\n\n\
            The program committee",
            abs.first_name, abs.title, abs.submission_code,
        ),
        html_body: format!(
            "<p>Dear {},</p>\
            <p>We have received your abstract \u{201c}{}\u{201d}.</p>\
            <p>Your submission code is <strong>{}</strong>. You can follow \
            the review progress at any time \
            <a href=\"{tracking_url}\">here</a>.</p>\
            <p>The program committee</p>",
            abs.first_name, abs.title, abs.submission_code,
        ),
    }
}

fn status_email(config: &Config, abs: &Abstract) -> OutgoingEmail {
    let tracking_url = abs.absolute_url(config);
    let comments = abs
        .reviewer_comments
        .as_deref()
        .filter(|_| abs.status.notice_includes_comments())
        .filter(|c| !c.trim().is_empty());

    let text_comments = match comments {
        Some(c) => format!("\n\nComments from the reviewers:\n\n{c}"),
        None => String::new(),
    };
    let html_comments = match comments {
        Some(c) => format!("<p>Comments from the reviewers:</p><blockquote>{c}</blockquote>"),
        None => String::new(),
    };

    OutgoingEmail {
        to: abs.email.clone(),
        subject: format!("Abstract {}: {}", abs.submission_code, abs.status),
        text_body: format!(
            "Dear {},\n\n\
            The status of your abstract \"{}\" ({}) is now: {}.{text_comments}\n\n\
            Details: {tracking_url}\n\n\
            The program committee",
            abs.first_name, abs.title, abs.submission_code, abs.status,
        ),
        html_body: format!(
            "<p>Dear {},</p>\
            <p>The status of your abstract \u{201c}{}\u{201d} ({}) is now: \
            <strong>{}</strong>.</p>{html_comments}\
            <p><a href=\"{tracking_url}\">Details</a></p>\
            <p>The program committee</p>",
            abs.first_name, abs.title, abs.submission_code, abs.status,
        ),
    }
}

fn welcome_email(config: &Config, user: &User, reset_token: &str) -> OutgoingEmail {
    let reset_url = format!("{}/reset-password?token={reset_token}", config.domain);
    OutgoingEmail {
        to: user.email.clone(),
        subject: "Your presenter account".to_string(),
        text_body: format!(
            "Dear {},\n\n\
            Congratulations! A presenter account has been created for you.\n\n\
            Set your password within the next 24 hours using this link:\n\n\
            {reset_url}\n\n\
            The program committee",
            user.first_name,
        ),
        html_body: format!(
            "<p>Dear {},</p>\
            <p>Congratulations! A presenter account has been created for you.</p>\
            <p><a href=\"{reset_url}\">Set your password</a> within the next \
            24 hours.</p>\
            <p>The program committee</p>",
            user.first_name,
        ),
    }
}

fn registration_email(registration: &Registration) -> OutgoingEmail {
    OutgoingEmail {
        to: registration.email.clone(),
        subject: "Registration received".to_string(),
        text_body: format!(
            "Dear {},\n\n\
            Thank you for registering. We look forward to seeing you at the \
            conference.\n\n\
            The organizing committee",
            registration.first_name,
        ),
        html_body: format!(
            "<p>Dear {},</p>\
            <p>Thank you for registering. We look forward to seeing you at \
            the conference.</p>\
            <p>The organizing committee</p>",
            registration.first_name,
        ),
    }
}

fn volunteer_email(application: &VolunteerApplication) -> OutgoingEmail {
    OutgoingEmail {
        to: application.email.clone(),
        subject: "Volunteer application received".to_string(),
        text_body: format!(
            "Dear {},\n\n\
            Thank you for offering to volunteer. We will be in touch about \
            scheduling.\n\n\
            The organizing committee",
            application.first_name,
        ),
        html_body: format!(
            "<p>Dear {},</p>\
            <p>Thank you for offering to volunteer. We will be in touch \
            about scheduling.</p>\
            <p>The organizing committee</p>",
            application.first_name,
        ),
    }
}

impl AppState {
    pub async fn send_submission_received(&self, abs: &Abstract) -> AppResult {
        self.mailer.send(received_email(&self.config, abs)).await
    }

    pub async fn send_status_notice(&self, abs: &Abstract) -> AppResult {
        self.mailer.send(status_email(&self.config, abs)).await
    }

    pub async fn send_registration_received(&self, registration: &Registration) -> AppResult {
        self.mailer.send(registration_email(registration)).await
    }

    pub async fn send_volunteer_received(&self, application: &VolunteerApplication) -> AppResult {
        self.mailer.send(volunteer_email(application)).await
    }

    /// Ensures an accepted abstract's author has a presenter account, links
    /// it to the abstract, and welcomes a newly created account with a
    /// password-reset link.
    ///
    /// Safe to re-run: the account lookup is an upsert, so a retry after a
    /// partial failure never creates a duplicate or re-sends the welcome.
    pub async fn provision_presenter(&self, abs: &Abstract) -> AppResult<User> {
        let (user, created) = self.find_or_create_presenter(abs).await?;

        if abs.presenter_user_id != Some(user.id) {
            self.link_presenter(abs.id, user.id).await?;
        }

        if created {
            let reset_token = self.create_reset_token(user.id).await?;
            // The account exists and is linked even if the welcome cannot be
            // delivered; staff can issue a fresh reset link later.
            if let Err(error) = self
                .mailer
                .send(welcome_email(&self.config, &user, &reset_token))
                .await
            {
                tracing::warn!(?error, user_id = ?user.id, "Failed to send presenter welcome");
            }
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{AbstractId, Status, Track};
    use chrono::Utc;

    fn sample_abstract(status: Status, comments: Option<&str>) -> Abstract {
        Abstract {
            id: AbstractId(1),
            submission_code: "ABS-K7Q2ZM4D".to_string(),
            title: "Strained lattices".to_string(),
            body: "...".to_string(),
            track: Track::Research,
            first_name: "Ada".to_string(),
            last_name: "Voss".to_string(),
            email: "ada@example.org".to_string(),
            organization: None,
            phone: None,
            coauthors: None,
            file_name: None,
            has_file: false,
            status,
            reviewer_comments: comments.map(str::to_string),
            session_slug: None,
            staff_notes: None,
            presenter_user_id: None,
            submitted_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn receipt_contains_code_and_tracking_link() {
        let config = Config::for_tests();
        let email = received_email(&config, &sample_abstract(Status::Received, None));
        assert_eq!(email.to, "ada@example.org");
        assert!(email.subject.contains("ABS-K7Q2ZM4D"));
        assert!(email
            .text_body
            .contains("http://localhost:3000/track?code=ABS-K7Q2ZM4D"));
    }

    #[test]
    fn comments_only_appear_for_decided_statuses() {
        let config = Config::for_tests();

        let decided = status_email(
            &config,
            &sample_abstract(Status::Revisions, Some("Tighten section 3.")),
        );
        assert!(decided.text_body.contains("Tighten section 3."));

        let undecided = status_email(
            &config,
            &sample_abstract(Status::UnderReview, Some("Tighten section 3.")),
        );
        assert!(!undecided.text_body.contains("Tighten section 3."));

        let blank = status_email(&config, &sample_abstract(Status::Accepted, Some("  ")));
        assert!(!blank.text_body.contains("Comments from the reviewers"));
    }

    #[test]
    fn welcome_links_the_reset_token() {
        let config = Config::for_tests();
        let user = User {
            id: crate::db::UserId(3),
            email: "ada@example.org".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Voss".to_string(),
            organization: None,
            phone: None,
            role: crate::db::Role::Presenter,
            password_hash: String::new(),
            reset_token: None,
            reset_token_expiry: None,
            created_from_abstract_id: None,
            created_at: Utc::now(),
        };
        let email = welcome_email(&config, &user, "t0k3n");
        assert!(email
            .text_body
            .contains("http://localhost:3000/reset-password?token=t0k3n"));
        assert!(email.text_body.contains("24 hours"));
    }
}
