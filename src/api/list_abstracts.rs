use serde::Deserialize;

use crate::api::AbstractView;
use crate::db::{Status, User};
use crate::error::AppError;
use crate::traits::RequestBody;
use crate::AppState;

/// Staff see every abstract; reviewers see the ones assigned to them.
#[derive(Deserialize, Debug)]
pub struct ListAbstracts {
    pub status: Option<Status>,
}

impl RequestBody for ListAbstracts {
    type Response = axum::Json<Vec<AbstractView>>;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        let user = user.ok_or(AppError::NotLoggedIn)?;
        let abstracts = state.list_abstracts(&user, self.status).await?;
        Ok(axum::Json(
            abstracts
                .into_iter()
                .map(|abs| AbstractView::new(abs, user.role))
                .collect(),
        ))
    }
}
