pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod services;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::SharedStore;
use crate::services::MediaStorage;

/// Shared by every handler through axum `State`
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: SharedStore,
}

impl AppState {
    pub fn new(config: AppConfig, store: SharedStore) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    pub fn media(&self) -> MediaStorage {
        MediaStorage::new(&self.config.media)
    }
}

/// The complete router; the binary and the integration tests serve the same one
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let protected = Router::new()
        .merge(profile_routes())
        .merge(attr_routes())
        .merge(recipe_routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(user_public_routes())
        // Protected API
        .merge(protected);

    // Uploaded media, read-only
    let media_prefix = config.media.url_prefix.trim_end_matches('/');
    if !media_prefix.is_empty() {
        router = router.nest_service(media_prefix, ServeDir::new(&config.media.root));
    }

    let mut router = router
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .with_state(state);

    // Global middleware
    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn user_public_routes() -> Router<AppState> {
    use axum::routing::post;
    use handlers::public::user;

    Router::new()
        .route("/user/create", post(user::user_create))
        .route("/user/token", post(user::user_token))
}

fn profile_routes() -> Router<AppState> {
    use handlers::protected::user;

    Router::new().route(
        "/user/me",
        get(user::me_get).put(user::me_put).patch(user::me_patch),
    )
}

fn attr_routes() -> Router<AppState> {
    use handlers::protected::attrs::{attr_delete, attr_list, attr_patch, attr_put, Ingredients, Tags};

    Router::new()
        .route("/recipe/tags", get(attr_list::<Tags>))
        .route(
            "/recipe/tags/:id",
            axum::routing::put(attr_put::<Tags>)
                .patch(attr_patch::<Tags>)
                .delete(attr_delete::<Tags>),
        )
        .route("/recipe/ingredients", get(attr_list::<Ingredients>))
        .route(
            "/recipe/ingredients/:id",
            axum::routing::put(attr_put::<Ingredients>)
                .patch(attr_patch::<Ingredients>)
                .delete(attr_delete::<Ingredients>),
        )
}

fn recipe_routes() -> Router<AppState> {
    use axum::routing::post;
    use handlers::protected::recipes;

    Router::new()
        // Collection
        .route(
            "/recipe/recipes",
            get(recipes::recipe_list).post(recipes::recipe_create),
        )
        // Record
        .route(
            "/recipe/recipes/:id",
            get(recipes::recipe_get)
                .put(recipes::recipe_put)
                .patch(recipes::recipe_patch)
                .delete(recipes::recipe_delete),
        )
        .route(
            "/recipe/recipes/:id/upload-image",
            post(recipes::recipe_upload_image),
        )
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Recipe API",
            "version": version,
            "description": "Per-user recipes, tags and ingredients with token authentication",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "user": "/user/create, /user/token (public), /user/me (protected)",
                "tags": "/recipe/tags[/:id] (protected)",
                "ingredients": "/recipe/ingredients[/:id] (protected)",
                "recipes": "/recipe/recipes[/:id] (protected)",
                "upload": "/recipe/recipes/:id/upload-image (protected, multipart)",
                "media": format!("{}/* (public)", state.config.media.url_prefix),
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
