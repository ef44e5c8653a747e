// handlers/protected/attrs.rs - tags and ingredients
//
// Both resources share one set of handlers, selected by `AttrResource::KIND`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    Extension, Json,
};

use crate::api::format::{attr_views, AttrView};
use crate::api::payload::AttrPayload;
use crate::database::models::AttrKind;
use crate::filter::AttrQuery;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::AppState;

pub trait AttrResource: Send + Sync + 'static {
    const KIND: AttrKind;
}

pub struct Tags;
pub struct Ingredients;

impl AttrResource for Tags {
    const KIND: AttrKind = AttrKind::Tag;
}

impl AttrResource for Ingredients {
    const KIND: AttrKind = AttrKind::Ingredient;
}

/// GET /recipe/{tags,ingredients}[?assigned_only=1] - caller's entities, name descending
pub async fn attr_list<R: AttrResource>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    query: Result<Query<AttrQuery>, QueryRejection>,
) -> ApiResult<Vec<AttrView>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let attrs = state.store.list_attrs(R::KIND, auth.id(), &filter).await?;
    Ok(ApiResponse::success(attr_views(&attrs)))
}

/// PUT /recipe/{tags,ingredients}/:id - rename, `name` required
pub async fn attr_put<R: AttrResource>(
    state: State<AppState>,
    auth: Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AttrPayload>, JsonRejection>,
) -> ApiResult<AttrView> {
    attr_update::<R>(state, auth, id, payload, true).await
}

/// PATCH /recipe/{tags,ingredients}/:id - rename if `name` is given
pub async fn attr_patch<R: AttrResource>(
    state: State<AppState>,
    auth: Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AttrPayload>, JsonRejection>,
) -> ApiResult<AttrView> {
    attr_update::<R>(state, auth, id, payload, false).await
}

async fn attr_update<R: AttrResource>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AttrPayload>, JsonRejection>,
    required: bool,
) -> ApiResult<AttrView> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let attr = match payload.validate(required)? {
        Some(name) => state.store.rename_attr(R::KIND, auth.id(), id, &name).await?,
        None => state.store.get_attr(R::KIND, auth.id(), id).await?,
    };
    Ok(ApiResponse::success(AttrView::from(&attr)))
}

/// DELETE /recipe/{tags,ingredients}/:id - removes the entity and its recipe links
pub async fn attr_delete<R: AttrResource>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = id?;
    state.store.delete_attr(R::KIND, auth.id(), id).await?;
    tracing::debug!("User {} deleted {} {}", auth.id(), R::KIND.label(), id);
    Ok(ApiResponse::no_content())
}
