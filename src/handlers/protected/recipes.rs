// handlers/protected/recipes.rs - recipe collection, records and image upload

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    Extension, Json,
};

use crate::api::format::{RecipeRepr, RecipeView};
use crate::api::payload::RecipePayload;
use crate::error::ApiError;
use crate::filter::RecipeQuery;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::RecipeService;
use crate::AppState;

const IMAGE_FIELD: &str = "image";

fn service(state: &AppState) -> RecipeService<'_> {
    RecipeService::new(state.store.as_ref(), state.media())
}

/// GET /recipe/recipes[?tags=1,2&ingredients=3] - caller's recipes, id descending
///
/// Each supplied id list matches recipes linked to any of its ids; supplying
/// both lists requires a match on each.
pub async fn recipe_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    query: Result<Query<RecipeQuery>, QueryRejection>,
) -> ApiResult<Vec<RecipeRepr>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let recipes = state.store.list_recipes(auth.id(), &filter).await?;
    Ok(ApiResponse::success(RecipeView::List.render_all(&recipes, &state.config.media)))
}

/// POST /recipe/recipes - create with nested get-or-create tags/ingredients
///
/// Expected Input:
/// ```json
/// {
///   "title": "Thai Prawn Curry",
///   "time_minutes": 30,
///   "price": "2.50",
///   "tags": [{ "name": "Thai" }, { "name": "Dinner" }],
///   "ingredients": [{ "name": "Prawns" }]
/// }
/// ```
pub async fn recipe_create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<RecipePayload>, JsonRejection>,
) -> ApiResult<RecipeRepr> {
    let Json(payload) = payload?;
    let recipe = service(&state).create(auth.id(), payload).await?;
    Ok(ApiResponse::created(RecipeView::Detail.render(&recipe, &state.config.media)))
}

/// GET /recipe/recipes/:id
pub async fn recipe_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<RecipeRepr> {
    let Path(id) = id?;
    let recipe = state.store.get_recipe(auth.id(), id).await?;
    Ok(ApiResponse::success(RecipeView::Detail.render(&recipe, &state.config.media)))
}

/// PUT /recipe/recipes/:id - full update; title, time_minutes and price required
pub async fn recipe_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RecipePayload>, JsonRejection>,
) -> ApiResult<RecipeRepr> {
    recipe_update(state, auth, id, payload, false).await
}

/// PATCH /recipe/recipes/:id - partial update; present tag/ingredient lists replace the current set
pub async fn recipe_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RecipePayload>, JsonRejection>,
) -> ApiResult<RecipeRepr> {
    recipe_update(state, auth, id, payload, true).await
}

async fn recipe_update(
    state: AppState,
    auth: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RecipePayload>, JsonRejection>,
    partial: bool,
) -> ApiResult<RecipeRepr> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let recipe = service(&state).update(auth.id(), id, payload, partial).await?;
    Ok(ApiResponse::success(RecipeView::Detail.render(&recipe, &state.config.media)))
}

/// DELETE /recipe/recipes/:id - removes the recipe, its links and its image file
pub async fn recipe_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = id?;
    service(&state).delete(auth.id(), id).await?;
    Ok(ApiResponse::no_content())
}

/// POST /recipe/recipes/:id/upload-image - multipart form with an `image` file field
pub async fn recipe_upload_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<RecipeRepr> {
    let Path(id) = id?;
    // a foreign or missing recipe is 404 whatever the body holds
    state.store.get_recipe(auth.id(), id).await?;
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            upload = Some(field.bytes().await?.to_vec());
            break;
        }
    }

    let recipe = service(&state).upload_image(auth.id(), id, upload).await?;
    Ok(ApiResponse::success(RecipeView::Image.render(&recipe, &state.config.media)))
}
