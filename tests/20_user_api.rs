mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{data, TestServer, PASSWORD};
use recipe_api::database::Store;

#[tokio::test]
async fn create_user_success() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .client
        .post(server.url("/user/create"))
        .json(&json!({ "email": "test@EXAMPLE.com", "password": PASSWORD, "name": "Test Name" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let user = data(res).await?;
    assert_eq!(user["email"], "test@example.com");
    assert_eq!(user["name"], "Test Name");
    assert!(user.get("password").is_none(), "password leaked: {}", user);
    assert!(user.get("password_hash").is_none(), "password hash leaked: {}", user);

    let stored = server.store.find_user_by_email("test@example.com").await?.expect("user stored");
    assert_ne!(stored.password_hash, PASSWORD);

    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    server.create_user("test@example.com").await?;

    let res = server
        .client
        .post(server.url("/user/create"))
        .json(&json!({ "email": "test@example.com", "password": PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = res.json::<Value>().await?;
    assert!(body["field_errors"]["email"].is_string(), "expected email error: {}", body);

    Ok(())
}

#[tokio::test]
async fn short_password_is_rejected_and_nothing_created() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .client
        .post(server.url("/user/create"))
        .json(&json!({ "email": "test@example.com", "password": "pw", "name": "Test Name" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["password"].is_string());
    assert!(server.store.find_user_by_email("test@example.com").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn token_for_valid_credentials() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.create_user("test@example.com").await?;
    assert!(!user.token.is_empty());

    Ok(())
}

#[tokio::test]
async fn token_bad_credentials_is_400() -> Result<()> {
    let server = TestServer::start().await?;
    server.create_user("test@example.com").await?;

    let res = server
        .client
        .post(server.url("/user/token"))
        .json(&json!({ "email": "test@example.com", "password": "badpass" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert!(body["field_errors"]["non_field_errors"].is_string(), "{}", body);
    assert!(body.get("data").is_none());

    Ok(())
}

#[tokio::test]
async fn token_for_unknown_email_is_400() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .client
        .post(server.url("/user/token"))
        .json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn token_blank_password_is_400() -> Result<()> {
    let server = TestServer::start().await?;
    server.create_user("test@example.com").await?;

    let res = server
        .client
        .post(server.url("/user/token"))
        .json(&json!({ "email": "test@example.com", "password": "" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert!(body["field_errors"]["password"].is_string(), "{}", body);

    Ok(())
}

#[tokio::test]
async fn me_requires_authentication() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.client.get(server.url("/user/me")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/user/me"))
        .bearer_auth("not-a-token")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], "UNAUTHORIZED");

    Ok(())
}

#[tokio::test]
async fn me_accepts_token_scheme() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.create_user("test@example.com").await?;

    let res = server
        .client
        .get(server.url("/user/me"))
        .header("Authorization", format!("Token {}", user.token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let me = data(res).await?;
    assert_eq!(me, json!({ "email": "test@example.com", "name": "Test Name" }));

    Ok(())
}

#[tokio::test]
async fn me_rejects_post() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.create_user("test@example.com").await?;

    let res = server.post(&user, "/user/me").json(&json!({})).send().await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    Ok(())
}

#[tokio::test]
async fn patch_me_updates_profile_and_password() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.create_user("test@example.com").await?;

    let res = server
        .patch(&user, "/user/me")
        .json(&json!({ "name": "Updated name", "password": "newpassword123" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let me = data(res).await?;
    assert_eq!(me["name"], "Updated name");

    // the new password works, the old one no longer does
    let res = server
        .client
        .post(server.url("/user/token"))
        .json(&json!({ "email": "test@example.com", "password": "newpassword123" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let res = server
        .client
        .post(server.url("/user/token"))
        .json(&json!({ "email": "test@example.com", "password": PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn put_me_requires_email_and_password() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.create_user("test@example.com").await?;

    let res = server.put(&user, "/user/me").json(&json!({ "name": "Only name" })).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .put(&user, "/user/me")
        .json(&json!({ "email": "new@example.com", "password": "another123", "name": "New" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(data(res).await?["email"], "new@example.com");

    // the token still resolves to the same user after an email change
    let res = server.get(&user, "/user/me").send().await?;
    assert_eq!(data(res).await?["email"], "new@example.com");

    Ok(())
}

#[tokio::test]
async fn patch_me_to_taken_email_is_400() -> Result<()> {
    let server = TestServer::start().await?;
    server.create_user("taken@example.com").await?;
    let user = server.create_user("test@example.com").await?;

    let res = server
        .patch(&user, "/user/me")
        .json(&json!({ "email": "taken@example.com" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert!(body["field_errors"]["email"].is_string());

    Ok(())
}
