use async_trait::async_trait;
use std::sync::Arc;

use super::manager::DatabaseError;
use super::models::{Attr, AttrKind, NewUser, Recipe, RecipeChanges, RecipeDraft, User, UserChanges};
use crate::filter::{AttrFilter, RecipeFilter};

/// The data-access boundary. Every tag, ingredient and recipe operation takes
/// the owning user's id; rows owned by anyone else behave as absent
/// (`DatabaseError::NotFound`).
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;

    // Users

    /// Fails with `Conflict` on a registered email
    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError>;
    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, DatabaseError>;

    // Tags and ingredients

    /// Name descending, de-duplicated
    async fn list_attrs(&self, kind: AttrKind, owner: i64, filter: &AttrFilter) -> Result<Vec<Attr>, DatabaseError>;
    async fn get_attr(&self, kind: AttrKind, owner: i64, id: i64) -> Result<Attr, DatabaseError>;
    /// Atomic insert-or-fetch on (owner, name)
    async fn get_or_create_attr(&self, kind: AttrKind, owner: i64, name: &str) -> Result<Attr, DatabaseError>;
    async fn rename_attr(&self, kind: AttrKind, owner: i64, id: i64, name: &str) -> Result<Attr, DatabaseError>;
    /// Removes the row and its recipe links, never the recipes
    async fn delete_attr(&self, kind: AttrKind, owner: i64, id: i64) -> Result<(), DatabaseError>;

    // Recipes

    /// Id descending, de-duplicated
    async fn list_recipes(&self, owner: i64, filter: &RecipeFilter) -> Result<Vec<Recipe>, DatabaseError>;
    async fn get_recipe(&self, owner: i64, id: i64) -> Result<Recipe, DatabaseError>;
    /// All-or-nothing, including nested get-or-create
    async fn create_recipe(&self, owner: i64, draft: RecipeDraft) -> Result<Recipe, DatabaseError>;
    /// All-or-nothing; present association lists replace the current set
    async fn update_recipe(&self, owner: i64, id: i64, changes: RecipeChanges) -> Result<Recipe, DatabaseError>;
    /// Returns the updated recipe and the image path it replaced
    async fn set_recipe_image(&self, owner: i64, id: i64, image: &str) -> Result<(Recipe, Option<String>), DatabaseError>;
    /// Returns the removed recipe so its media can be cleaned up
    async fn delete_recipe(&self, owner: i64, id: i64) -> Result<Recipe, DatabaseError>;
}

pub type SharedStore = Arc<dyn Store>;

/// Unique names in first-seen order
pub(crate) fn distinct_names(names: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(&name.as_str()) {
            out.push(name);
        }
    }
    out
}
