mod common;

use anyhow::Result;
use reqwest::StatusCode;

use common::TestServer;

#[tokio::test]
async fn root_describes_service() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.client.get(server.url("/")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Recipe API");
    assert!(body["data"]["endpoints"]["recipes"].is_string(), "endpoints missing: {}", body);

    Ok(())
}

#[tokio::test]
async fn health_reports_store_ok() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "ok");

    Ok(())
}
