// handlers/public/user.rs - registration and token acquisition

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::api::format::{TokenView, UserView};
use crate::api::payload::{TokenPayload, UserPayload};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::UserService;
use crate::AppState;

/// POST /user/create - Register a new user
///
/// Expected Input:
/// ```json
/// { "email": "test@example.com", "password": "testpass123", "name": "Test Name" }
/// ```
///
/// Responds 201 with `{ "email", "name" }`; the password is never echoed.
pub async fn user_create(
    State(state): State<AppState>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<UserView> {
    let Json(payload) = payload?;
    let user = UserService::new(state.store.as_ref(), &state.config.security)
        .register(payload)
        .await?;
    Ok(ApiResponse::created(UserView::from(&user)))
}

/// POST /user/token - Exchange credentials for a bearer token
///
/// Bad credentials answer 400 with `field_errors.non_field_errors`.
pub async fn user_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenPayload>, JsonRejection>,
) -> ApiResult<TokenView> {
    let Json(payload) = payload?;
    let token = UserService::new(state.store.as_ref(), &state.config.security)
        .issue_token(payload)
        .await?;
    Ok(ApiResponse::success(TokenView { token }))
}
