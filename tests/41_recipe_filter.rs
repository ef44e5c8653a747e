mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{data, ids, TestServer, TestUser};

fn id_of(recipe: &Value) -> i64 {
    recipe["id"].as_i64().unwrap_or_default()
}

fn first_id(list: &Value) -> i64 {
    list[0]["id"].as_i64().unwrap_or_default()
}

async fn list(server: &TestServer, user: &TestUser, query: &str) -> Result<Vec<i64>> {
    let res = server.get(user, &format!("/recipe/recipes?{}", query)).send().await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "list failed: {}", res.status());
    Ok(ids(&data(res).await?))
}

#[tokio::test]
async fn filter_by_tags() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.create_user("user@example.com").await?;
    let curry = server.recipe(&user, json!({ "title": "Thai Vegetable Curry", "tags": [{ "name": "Vegan" }] })).await?;
    let tahini = server
        .recipe(&user, json!({ "title": "Aubergine with Tahini", "tags": [{ "name": "Vegetarian" }] }))
        .await?;
    let fish = server.recipe(&user, json!({ "title": "Fish and chips" })).await?;

    let query = format!("tags={},{}", first_id(&curry["tags"]), first_id(&tahini["tags"]));
    let found = list(&server, &user, &query).await?;
    assert!(found.contains(&id_of(&curry)));
    assert!(found.contains(&id_of(&tahini)));
    assert!(!found.contains(&id_of(&fish)));

    Ok(())
}

#[tokio::test]
async fn filter_by_ingredients() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.create_user("user@example.com").await?;
    let beans = server
        .recipe(&user, json!({ "title": "Posh Beans on Toast", "ingredients": [{ "name": "Feta Cheese" }] }))
        .await?;
    let chicken = server
        .recipe(&user, json!({ "title": "Chicken Cacciatore", "ingredients": [{ "name": "Chicken" }] }))
        .await?;
    let dal = server.recipe(&user, json!({ "title": "Red Lentil Dal" })).await?;

    let query = format!(
        "ingredients={},{}",
        first_id(&beans["ingredients"]),
        first_id(&chicken["ingredients"])
    );
    let found = list(&server, &user, &query).await?;
    assert_eq!(found, vec![id_of(&chicken), id_of(&beans)]);
    assert!(!found.contains(&id_of(&dal)));

    Ok(())
}

#[tokio::test]
async fn recipe_matching_several_ids_appears_once() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.create_user("user@example.com").await?;
    let recipe = server
        .recipe(&user, json!({ "tags": [{ "name": "Quick" }, { "name": "Cheap" }] }))
        .await?;
    let tag_ids = ids(&recipe["tags"]);

    let query = format!("tags={},{}", tag_ids[0], tag_ids[1]);
    assert_eq!(list(&server, &user, &query).await?, vec![id_of(&recipe)]);

    Ok(())
}

#[tokio::test]
async fn tags_and_ingredients_filters_combine() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.create_user("user@example.com").await?;
    let both = server
        .recipe(&user, json!({ "tags": [{ "name": "Dinner" }], "ingredients": [{ "name": "Rice" }] }))
        .await?;
    let tag_only = server.recipe(&user, json!({ "tags": [{ "name": "Dinner" }] })).await?;

    let query = format!(
        "tags={}&ingredients={}",
        first_id(&both["tags"]),
        first_id(&both["ingredients"])
    );
    let found = list(&server, &user, &query).await?;
    assert_eq!(found, vec![id_of(&both)]);
    assert!(!found.contains(&id_of(&tag_only)));

    Ok(())
}

#[tokio::test]
async fn filter_never_crosses_users() -> Result<()> {
    let server = TestServer::start().await?;
    let other = server.create_user("other@example.com").await?;
    let user = server.create_user("user@example.com").await?;
    let theirs = server.recipe(&other, json!({ "tags": [{ "name": "Shared" }] })).await?;

    let query = format!("tags={}", first_id(&theirs["tags"]));
    assert!(list(&server, &user, &query).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn empty_filter_lists_everything() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.create_user("user@example.com").await?;
    server.recipe(&user, json!({})).await?;

    assert_eq!(list(&server, &user, "tags=").await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn invalid_filter_id_is_400() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.create_user("user@example.com").await?;

    let res = server.get(&user, "/recipe/recipes?tags=1,abc").send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert!(body["field_errors"]["tags"].is_string(), "{}", body);

    Ok(())
}
