// handlers/protected/user.rs - the caller's own profile

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};

use crate::api::format::UserView;
use crate::api::payload::UserPayload;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::UserService;
use crate::AppState;

/// GET /user/me
pub async fn me_get(Extension(auth): Extension<AuthUser>) -> ApiResult<UserView> {
    Ok(ApiResponse::success(UserView::from(auth.user())))
}

/// PUT /user/me - replace email and password (name optional)
pub async fn me_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<UserView> {
    update_me(state, auth, payload, false).await
}

/// PATCH /user/me - change any subset of email, password and name
pub async fn me_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<UserView> {
    update_me(state, auth, payload, true).await
}

async fn update_me(
    state: AppState,
    auth: AuthUser,
    payload: Result<Json<UserPayload>, JsonRejection>,
    partial: bool,
) -> ApiResult<UserView> {
    let Json(payload) = payload?;
    let user = UserService::new(state.store.as_ref(), &state.config.security)
        .update_profile(auth.user(), payload, partial)
        .await?;
    Ok(ApiResponse::success(UserView::from(&user)))
}
