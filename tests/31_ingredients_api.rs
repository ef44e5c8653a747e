mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{data, ids, names, TestServer};
use recipe_api::database::models::AttrKind;

#[tokio::test]
async fn ingredients_require_authentication() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.client.get(server.url("/recipe/ingredients")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn list_ingredients_limited_and_ordered() -> Result<()> {
    let server = TestServer::start().await?;
    let other = server.create_user("user2@example.com").await?;
    let user = server.create_user("user@example.com").await?;
    server.attr(AttrKind::Ingredient, &other, "Salt").await?;
    server.attr(AttrKind::Ingredient, &user, "Kale").await?;
    server.attr(AttrKind::Ingredient, &user, "Vanilla").await?;

    let res = server.get(&user, "/recipe/ingredients").send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(names(&data(res).await?), vec!["Vanilla", "Kale"]);

    Ok(())
}

#[tokio::test]
async fn update_and_delete_ingredient() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.create_user("user@example.com").await?;
    let ingredient = server.attr(AttrKind::Ingredient, &user, "Cilantro").await?;

    let res = server
        .patch(&user, &format!("/recipe/ingredients/{}", ingredient.id))
        .json(&json!({ "name": "Coriander" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(data(res).await?, json!({ "id": ingredient.id, "name": "Coriander" }));

    let res = server
        .delete(&user, &format!("/recipe/ingredients/{}", ingredient.id))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let ingredients = data(server.get(&user, "/recipe/ingredients").send().await?).await?;
    assert!(ids(&ingredients).is_empty());

    Ok(())
}

#[tokio::test]
async fn other_users_ingredient_is_not_found() -> Result<()> {
    let server = TestServer::start().await?;
    let other = server.create_user("user2@example.com").await?;
    let user = server.create_user("user@example.com").await?;
    let ingredient = server.attr(AttrKind::Ingredient, &other, "Saffron").await?;

    let res = server
        .patch(&user, &format!("/recipe/ingredients/{}", ingredient.id))
        .json(&json!({ "name": "Stolen" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server
        .delete(&user, &format!("/recipe/ingredients/{}", ingredient.id))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn filter_ingredients_assigned_to_recipes() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.create_user("user@example.com").await?;
    server.attr(AttrKind::Ingredient, &user, "Turkey").await?;
    server
        .recipe(&user, json!({ "title": "Apple Crumble", "ingredients": [{ "name": "Apples" }] }))
        .await?;
    server
        .recipe(&user, json!({ "title": "Apple Pie", "ingredients": [{ "name": "Apples" }] }))
        .await?;

    let ingredients = data(server.get(&user, "/recipe/ingredients?assigned_only=1").send().await?).await?;
    assert_eq!(names(&ingredients), vec!["Apples"]);

    let all = data(server.get(&user, "/recipe/ingredients?assigned_only=0").send().await?).await?;
    assert_eq!(names(&all), vec!["Turkey", "Apples"]);

    Ok(())
}
