use axum::{
    Json,
    extract::{Path, State},
};

use brocat_types::models::UserView;

use crate::auth::AppState;
use crate::error::{ApiError, run_blocking};
use crate::serialize::{user_view, user_views};

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserView>>, ApiError> {
    let views = run_blocking(move || {
        let users = state.db.list_users()?;
        Ok(user_views(&state.db, &users)?)
    })
    .await?;
    Ok(Json(views))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserView>, ApiError> {
    let view = run_blocking(move || {
        let user = state.db.get_user_by_id(id)?.ok_or(ApiError::NotFound)?;
        let brocat_ids = state.db.brocat_ids_for_user(user.id)?;
        Ok(user_view(&user, brocat_ids))
    })
    .await?;
    Ok(Json(view))
}
