use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::decode_token;
use crate::database::models::User;
use crate::error::ApiError;
use crate::AppState;

/// The authenticated caller, re-loaded from the store on every request
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

impl AuthUser {
    /// Owner id every scoped store call is made with
    pub fn id(&self) -> i64 {
        self.0.id
    }

    pub fn user(&self) -> &User {
        &self.0
    }
}

/// Validates the bearer token, loads the user and injects `AuthUser` into the request
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&headers).map_err(ApiError::unauthorized)?;
    let claims = decode_token(token, &state.config.security)?;

    let user = match state.store.find_user(claims.sub).await? {
        Some(user) if user.is_active => user,
        Some(_) => {
            tracing::warn!("Rejected token for inactive user id {}", claims.sub);
            return Err(ApiError::unauthorized("User inactive or deleted."));
        }
        None => {
            tracing::warn!("Rejected token for unknown user id {}", claims.sub);
            return Err(ApiError::unauthorized("User inactive or deleted."));
        }
    };

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

/// Token from `Authorization: Bearer <token>` or `Authorization: Token <token>`
fn extract_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or("Authentication credentials were not provided.")?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format.")?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .or_else(|| auth_str.strip_prefix("Token "))
        .ok_or("Authorization header must use Bearer or Token format.")?
        .trim();

    if token.is_empty() {
        return Err("Invalid token header. No credentials provided.");
    }
    Ok(token)
}
