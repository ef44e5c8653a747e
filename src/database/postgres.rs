use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{Attr, AttrKind, NewUser, Recipe, RecipeChanges, RecipeDraft, User, UserChanges};
use super::query_builder::QueryBuilder;
use super::store::{distinct_names, Store};
use crate::filter::{dedupe_by_id, AttrFilter, Filter, RecipeFilter};

const USER_COLUMNS: &str = "id, email, password_hash, name, is_active, is_staff, created_at";
const RECIPE_COLUMNS: &str = "id, user_id, title, description, time_minutes, price, link, image";
const DUPLICATE_EMAIL: &str = "user with this email already exists.";

/// `Store` over a Postgres pool. Multi-statement writes run in one transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// One association joined to its recipe
#[derive(FromRow)]
struct LinkRow {
    recipe_id: i64,
    id: i64,
    user_id: i64,
    name: String,
}

async fn upsert_attr(conn: &mut PgConnection, kind: AttrKind, owner: i64, name: &str) -> Result<Attr, DatabaseError> {
    // The no-op update makes RETURNING yield the existing row on conflict
    let sql = format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) \
         ON CONFLICT (user_id, name) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id, user_id, name",
        kind.table()
    );
    let attr = sqlx::query_as::<_, Attr>(&sql)
        .bind(owner)
        .bind(name)
        .fetch_one(conn)
        .await?;
    Ok(attr)
}

/// Replace the association set of one recipe, creating missing names
async fn set_links(
    conn: &mut PgConnection,
    kind: AttrKind,
    owner: i64,
    recipe_id: i64,
    names: &[String],
) -> Result<(), DatabaseError> {
    let mut ids = Vec::with_capacity(names.len());
    for name in distinct_names(names) {
        ids.push(upsert_attr(&mut *conn, kind, owner, name).await?.id);
    }

    sqlx::query(&format!("DELETE FROM {} WHERE recipe_id = $1", kind.link_table()))
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    if !ids.is_empty() {
        let sql = format!(
            "INSERT INTO {} (recipe_id, {}) SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
            kind.link_table(),
            kind.link_column()
        );
        sqlx::query(&sql).bind(recipe_id).bind(ids).execute(&mut *conn).await?;
    }
    Ok(())
}

/// Fill `tags` and `ingredients` for every recipe, ordered by attr id
async fn load_links(conn: &mut PgConnection, recipes: &mut [Recipe]) -> Result<(), DatabaseError> {
    if recipes.is_empty() {
        return Ok(());
    }
    let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();

    for kind in [AttrKind::Tag, AttrKind::Ingredient] {
        let sql = format!(
            "SELECT l.recipe_id, a.id, a.user_id, a.name FROM {} l \
             JOIN {} a ON a.id = l.{} \
             WHERE l.recipe_id = ANY($1) ORDER BY a.id",
            kind.link_table(),
            kind.table(),
            kind.link_column()
        );
        let rows = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(ids.clone())
            .fetch_all(&mut *conn)
            .await?;

        let mut by_recipe: HashMap<i64, Vec<Attr>> = HashMap::new();
        for row in rows {
            by_recipe.entry(row.recipe_id).or_default().push(Attr {
                id: row.id,
                user_id: row.user_id,
                name: row.name,
            });
        }
        for recipe in recipes.iter_mut() {
            *recipe.attrs_mut(kind) = by_recipe.remove(&recipe.id).unwrap_or_default();
        }
    }
    Ok(())
}

/// Owned recipe row, optionally locked for the rest of the transaction
async fn fetch_recipe_row(conn: &mut PgConnection, owner: i64, id: i64, lock: bool) -> Result<Recipe, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM recipes WHERE id = $1 AND user_id = $2{}",
        RECIPE_COLUMNS,
        if lock { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, Recipe>(&sql)
        .bind(id)
        .bind(owner)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Recipe"))
}

async fn fetch_recipe(conn: &mut PgConnection, owner: i64, id: i64, lock: bool) -> Result<Recipe, DatabaseError> {
    let mut recipe = fetch_recipe_row(&mut *conn, owner, id, lock).await?;
    load_links(conn, std::slice::from_mut(&mut recipe)).await?;
    Ok(recipe)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, name, is_staff) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(user.is_staff)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_unique(e, "email", DUPLICATE_EMAIL))
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(&self.pool).await?)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, DatabaseError> {
        let sql = format!(
            "UPDATE users SET email = COALESCE($2, email), password_hash = COALESCE($3, password_hash), \
             name = COALESCE($4, name) WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_unique(e, "email", DUPLICATE_EMAIL))?
            .ok_or_else(|| DatabaseError::not_found("User"))
    }

    async fn list_attrs(&self, kind: AttrKind, owner: i64, filter: &AttrFilter) -> Result<Vec<Attr>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let attrs = QueryBuilder::<Attr>::new(Filter::attrs(kind, owner, filter))
            .select_all(&mut conn)
            .await?;
        Ok(dedupe_by_id(attrs, |a| a.id))
    }

    async fn get_or_create_attr(&self, kind: AttrKind, owner: i64, name: &str) -> Result<Attr, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        upsert_attr(&mut conn, kind, owner, name).await
    }

    async fn get_attr(&self, kind: AttrKind, owner: i64, id: i64) -> Result<Attr, DatabaseError> {
        let sql = format!("SELECT id, user_id, name FROM {} WHERE id = $1 AND user_id = $2", kind.table());
        sqlx::query_as::<_, Attr>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found(kind.label()))
    }

    async fn rename_attr(&self, kind: AttrKind, owner: i64, id: i64, name: &str) -> Result<Attr, DatabaseError> {
        let sql = format!(
            "UPDATE {} SET name = $3 WHERE id = $1 AND user_id = $2 RETURNING id, user_id, name",
            kind.table()
        );
        sqlx::query_as::<_, Attr>(&sql)
            .bind(id)
            .bind(owner)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DatabaseError::from_unique(e, "name", format!("{} with this name already exists.", kind.label()))
            })?
            .ok_or_else(|| DatabaseError::not_found(kind.label()))
    }

    async fn delete_attr(&self, kind: AttrKind, owner: i64, id: i64) -> Result<(), DatabaseError> {
        // recipe links go with the row (ON DELETE CASCADE)
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1 AND user_id = $2", kind.table()))
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(kind.label()));
        }
        Ok(())
    }

    async fn list_recipes(&self, owner: i64, filter: &RecipeFilter) -> Result<Vec<Recipe>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let recipes = QueryBuilder::<Recipe>::new(Filter::recipes(owner, filter))
            .select_all(&mut conn)
            .await?;
        let mut recipes = dedupe_by_id(recipes, |r| r.id);
        load_links(&mut conn, &mut recipes).await?;
        Ok(recipes)
    }

    async fn get_recipe(&self, owner: i64, id: i64) -> Result<Recipe, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        fetch_recipe(&mut conn, owner, id, false).await
    }

    async fn create_recipe(&self, owner: i64, draft: RecipeDraft) -> Result<Recipe, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO recipes (user_id, title, description, time_minutes, price, link) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            RECIPE_COLUMNS
        );
        let mut recipe = sqlx::query_as::<_, Recipe>(&sql)
            .bind(owner)
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(draft.time_minutes)
            .bind(draft.price)
            .bind(&draft.link)
            .fetch_one(&mut *tx)
            .await?;

        for kind in [AttrKind::Tag, AttrKind::Ingredient] {
            set_links(&mut tx, kind, owner, recipe.id, draft.names(kind)).await?;
        }
        load_links(&mut tx, std::slice::from_mut(&mut recipe)).await?;

        tx.commit().await?;
        Ok(recipe)
    }

    async fn update_recipe(&self, owner: i64, id: i64, changes: RecipeChanges) -> Result<Recipe, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let mut recipe = fetch_recipe_row(&mut tx, owner, id, true).await?;
        changes.apply_fields(&mut recipe);

        sqlx::query(
            "UPDATE recipes SET title = $3, description = $4, time_minutes = $5, price = $6, link = $7 \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(recipe.time_minutes)
        .bind(recipe.price)
        .bind(&recipe.link)
        .execute(&mut *tx)
        .await?;

        for kind in [AttrKind::Tag, AttrKind::Ingredient] {
            if let Some(names) = changes.names(kind) {
                set_links(&mut tx, kind, owner, id, names).await?;
            }
        }
        load_links(&mut tx, std::slice::from_mut(&mut recipe)).await?;

        tx.commit().await?;
        Ok(recipe)
    }

    async fn set_recipe_image(&self, owner: i64, id: i64, image: &str) -> Result<(Recipe, Option<String>), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let mut recipe = fetch_recipe_row(&mut tx, owner, id, true).await?;
        let previous = recipe.image.replace(image.to_string());

        sqlx::query("UPDATE recipes SET image = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .bind(image)
            .execute(&mut *tx)
            .await?;
        load_links(&mut tx, std::slice::from_mut(&mut recipe)).await?;

        tx.commit().await?;
        Ok((recipe, previous))
    }

    async fn delete_recipe(&self, owner: i64, id: i64) -> Result<Recipe, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let recipe = fetch_recipe(&mut tx, owner, id, true).await?;
        sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(recipe)
    }
}
