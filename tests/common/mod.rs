#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use recipe_api::config::{AppConfig, StoreBackend};
use recipe_api::database::models::{Attr, AttrKind};
use recipe_api::database::{MemoryStore, SharedStore, Store};
use recipe_api::{app, AppState};

pub const PASSWORD: &str = "testpass123";

/// The real router on a free port, backed by the memory store and a
/// throwaway media root. One per test: each `#[tokio::test]` owns its runtime.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: SharedStore,
    pub config: AppConfig,
    pub client: reqwest::Client,
    media: TempDir,
}

/// A registered user with a token
pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub token: String,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_config(media_root: &Path) -> AppConfig {
    let mut config = AppConfig::development();
    config.database.backend = StoreBackend::Memory;
    config.security.password_hash_cost = 4;
    config.api.enable_request_logging = false;
    config.media.root = media_root.to_string_lossy().into_owned();
    config
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        init_tracing();

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let media = tempfile::tempdir().context("failed to create media root")?;
        let config = test_config(media.path());
        let store: SharedStore = Arc::new(MemoryStore::new());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        let router = app(AppState::new(config.clone(), store.clone()));
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            port,
            base_url,
            store,
            config,
            client: reqwest::Client::new(),
            media,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn media_root(&self) -> &Path {
        self.media.path()
    }

    /// Register through the API and fetch a token
    pub async fn create_user(&self, email: &str) -> Result<TestUser> {
        let res = self
            .client
            .post(self.url("/user/create"))
            .json(&json!({ "email": email, "password": PASSWORD, "name": "Test Name" }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create user failed: {}", res.text().await?);

        let res = self
            .client
            .post(self.url("/user/token"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "token failed: {}", res.text().await?);
        let body = res.json::<Value>().await?;
        let token = body["data"]["token"].as_str().context("token missing")?.to_string();

        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .context("registered user not found")?;
        Ok(TestUser { id: user.id, email: user.email, token })
    }

    /// Create a tag or ingredient directly in the store, bypassing the API
    pub async fn attr(&self, kind: AttrKind, user: &TestUser, name: &str) -> Result<Attr> {
        Ok(self.store.get_or_create_attr(kind, user.id, name).await?)
    }

    /// Create a recipe through the API and return its detail representation
    pub async fn recipe(&self, user: &TestUser, extra: Value) -> Result<Value> {
        let mut payload = json!({ "title": "Sample recipe", "time_minutes": 22, "price": "5.25" });
        if let (Some(base), Some(extra)) = (payload.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        let res = self.post(user, "/recipe/recipes").json(&payload).send().await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create recipe failed: {}", res.text().await?);
        data(res).await
    }

    pub fn get(&self, user: &TestUser, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(&user.token)
    }

    pub fn post(&self, user: &TestUser, path: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(&user.token)
    }

    pub fn put(&self, user: &TestUser, path: &str) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(&user.token)
    }

    pub fn patch(&self, user: &TestUser, path: &str) -> RequestBuilder {
        self.client.patch(self.url(path)).bearer_auth(&user.token)
    }

    pub fn delete(&self, user: &TestUser, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(&user.token)
    }
}

/// The `data` member of a success envelope
pub async fn data(res: Response) -> Result<Value> {
    let body = res.json::<Value>().await?;
    anyhow::ensure!(body["success"] == json!(true), "not a success envelope: {}", body);
    Ok(body["data"].clone())
}

/// Names of a `[{id, name}]` array, in order
pub fn names(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn ids(value: &Value) -> Vec<i64> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(|i| i["id"].as_i64()).collect())
        .unwrap_or_default()
}
