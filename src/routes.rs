use crate::traits::RequestBody;
use crate::{api, AppState};

pub(crate) fn router() -> axum::Router<AppState> {
    use axum::routing::{get, post};

    axum::Router::new()
        // Public surface
        .route(
            "/submit-abstract",
            post(api::submit_abstract::SubmitAbstract::as_multipart_form_handler),
        )
        .route("/track", get(api::track::TrackAbstract::as_handler_query))
        .route(
            "/register",
            post(api::register::Register::as_multipart_form_handler),
        )
        .route(
            "/volunteer",
            post(api::volunteer::Volunteer::as_multipart_form_handler),
        )
        // Authenticated surface
        .route(
            "/abstracts",
            get(api::list_abstracts::ListAbstracts::as_handler_query),
        )
        .route(
            "/update-abstract",
            post(api::update_abstract::UpdateAbstract::as_json_handler),
        )
        // Staff surface
        .route("/outbox", get(api::outbox::ListOutbox::as_handler_query))
        .route(
            "/outbox/retry",
            post(api::outbox::RetryOutboxJob::as_json_handler),
        )
}
