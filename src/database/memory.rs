use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::manager::DatabaseError;
use super::models::{Attr, AttrKind, NewUser, Recipe, RecipeChanges, RecipeDraft, User, UserChanges};
use super::store::{distinct_names, Store};
use crate::filter::{dedupe_by_id, AttrFilter, RecipeFilter};

/// In-process `Store` behind one `RwLock`. Each write operation holds the
/// write lock for its whole duration, which gives it transaction semantics.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, User>,
    tags: BTreeMap<i64, Attr>,
    ingredients: BTreeMap<i64, Attr>,
    /// Recipe rows; association vectors are left empty and hydrated on read
    recipes: BTreeMap<i64, Recipe>,
    /// (recipe_id, attr_id)
    recipe_tags: BTreeSet<(i64, i64)>,
    recipe_ingredients: BTreeSet<(i64, i64)>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn attrs(&self, kind: AttrKind) -> &BTreeMap<i64, Attr> {
        match kind {
            AttrKind::Tag => &self.tags,
            AttrKind::Ingredient => &self.ingredients,
        }
    }

    fn attrs_mut(&mut self, kind: AttrKind) -> &mut BTreeMap<i64, Attr> {
        match kind {
            AttrKind::Tag => &mut self.tags,
            AttrKind::Ingredient => &mut self.ingredients,
        }
    }

    fn links(&self, kind: AttrKind) -> &BTreeSet<(i64, i64)> {
        match kind {
            AttrKind::Tag => &self.recipe_tags,
            AttrKind::Ingredient => &self.recipe_ingredients,
        }
    }

    fn links_mut(&mut self, kind: AttrKind) -> &mut BTreeSet<(i64, i64)> {
        match kind {
            AttrKind::Tag => &mut self.recipe_tags,
            AttrKind::Ingredient => &mut self.recipe_ingredients,
        }
    }

    fn owned_attr(&self, kind: AttrKind, owner: i64, id: i64) -> Result<&Attr, DatabaseError> {
        self.attrs(kind)
            .get(&id)
            .filter(|a| a.user_id == owner)
            .ok_or_else(|| DatabaseError::not_found(kind.label()))
    }

    fn owned_recipe(&self, owner: i64, id: i64) -> Result<&Recipe, DatabaseError> {
        self.recipes
            .get(&id)
            .filter(|r| r.user_id == owner)
            .ok_or_else(|| DatabaseError::not_found("Recipe"))
    }

    fn get_or_create(&mut self, kind: AttrKind, owner: i64, name: &str) -> Attr {
        if let Some(existing) = self
            .attrs(kind)
            .values()
            .find(|a| a.user_id == owner && a.name == name)
        {
            return existing.clone();
        }
        let attr = Attr { id: self.next_id(), user_id: owner, name: name.to_string() };
        self.attrs_mut(kind).insert(attr.id, attr.clone());
        attr
    }

    /// Replace the association set of `recipe_id` for `kind`
    fn set_links(&mut self, kind: AttrKind, owner: i64, recipe_id: i64, names: &[String]) {
        let ids: Vec<i64> = distinct_names(names)
            .into_iter()
            .map(|name| self.get_or_create(kind, owner, name).id)
            .collect();
        let links = self.links_mut(kind);
        links.retain(|(r, _)| *r != recipe_id);
        links.extend(ids.into_iter().map(|id| (recipe_id, id)));
    }

    /// Attach associations, ordered by attr id
    fn hydrate(&self, row: &Recipe) -> Recipe {
        let mut recipe = row.clone();
        for kind in [AttrKind::Tag, AttrKind::Ingredient] {
            *recipe.attrs_mut(kind) = self
                .links(kind)
                .range((row.id, i64::MIN)..=(row.id, i64::MAX))
                .filter_map(|(_, attr_id)| self.attrs(kind).get(attr_id).cloned())
                .collect();
        }
        recipe
    }

    fn assigned(&self, kind: AttrKind, owner: i64, attr_id: i64) -> bool {
        self.links(kind).iter().any(|(recipe_id, id)| {
            *id == attr_id && self.recipes.get(recipe_id).is_some_and(|r| r.user_id == owner)
        })
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        let _tables = self.tables.read().await;
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Conflict {
                field: "email",
                message: "user with this email already exists.".to_string(),
            });
        }
        let user = User {
            id: tables.next_id(),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            is_active: true,
            is_staff: user.is_staff,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &changes.email {
            if tables.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(DatabaseError::Conflict {
                    field: "email",
                    message: "user with this email already exists.".to_string(),
                });
            }
        }
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("User"))?;
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        Ok(user.clone())
    }

    async fn list_attrs(&self, kind: AttrKind, owner: i64, filter: &AttrFilter) -> Result<Vec<Attr>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut attrs: Vec<Attr> = tables
            .attrs(kind)
            .values()
            .filter(|a| a.user_id == owner)
            .filter(|a| !filter.assigned_only || tables.assigned(kind, owner, a.id))
            .cloned()
            .collect();
        attrs.sort_by(|a, b| b.name.cmp(&a.name).then(b.id.cmp(&a.id)));
        Ok(dedupe_by_id(attrs, |a| a.id))
    }

    async fn get_attr(&self, kind: AttrKind, owner: i64, id: i64) -> Result<Attr, DatabaseError> {
        Ok(self.tables.read().await.owned_attr(kind, owner, id)?.clone())
    }

    async fn get_or_create_attr(&self, kind: AttrKind, owner: i64, name: &str) -> Result<Attr, DatabaseError> {
        Ok(self.tables.write().await.get_or_create(kind, owner, name))
    }

    async fn rename_attr(&self, kind: AttrKind, owner: i64, id: i64, name: &str) -> Result<Attr, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.owned_attr(kind, owner, id)?;
        if tables
            .attrs(kind)
            .values()
            .any(|a| a.user_id == owner && a.id != id && a.name == name)
        {
            return Err(DatabaseError::Conflict {
                field: "name",
                message: format!("{} with this name already exists.", kind.label()),
            });
        }
        let attr = tables
            .attrs_mut(kind)
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found(kind.label()))?;
        attr.name = name.to_string();
        Ok(attr.clone())
    }

    async fn delete_attr(&self, kind: AttrKind, owner: i64, id: i64) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.owned_attr(kind, owner, id)?;
        tables.attrs_mut(kind).remove(&id);
        tables.links_mut(kind).retain(|(_, attr_id)| *attr_id != id);
        Ok(())
    }

    async fn list_recipes(&self, owner: i64, filter: &RecipeFilter) -> Result<Vec<Recipe>, DatabaseError> {
        let tables = self.tables.read().await;
        let recipes: Vec<Recipe> = tables
            .recipes
            .values()
            .rev()
            .filter(|r| r.user_id == owner)
            .map(|r| tables.hydrate(r))
            .filter(|r| filter.matches(r))
            .collect();
        Ok(dedupe_by_id(recipes, |r| r.id))
    }

    async fn get_recipe(&self, owner: i64, id: i64) -> Result<Recipe, DatabaseError> {
        let tables = self.tables.read().await;
        let row = tables.owned_recipe(owner, id)?;
        Ok(tables.hydrate(row))
    }

    async fn create_recipe(&self, owner: i64, draft: RecipeDraft) -> Result<Recipe, DatabaseError> {
        let mut tables = self.tables.write().await;
        let row = Recipe {
            id: tables.next_id(),
            user_id: owner,
            title: draft.title.clone(),
            description: draft.description.clone(),
            time_minutes: draft.time_minutes,
            price: draft.price,
            link: draft.link.clone(),
            image: None,
            tags: vec![],
            ingredients: vec![],
        };
        tables.recipes.insert(row.id, row.clone());
        for kind in [AttrKind::Tag, AttrKind::Ingredient] {
            tables.set_links(kind, owner, row.id, draft.names(kind));
        }
        Ok(tables.hydrate(&row))
    }

    async fn update_recipe(&self, owner: i64, id: i64, changes: RecipeChanges) -> Result<Recipe, DatabaseError> {
        let mut tables = self.tables.write().await;
        let mut row = tables.owned_recipe(owner, id)?.clone();
        changes.apply_fields(&mut row);
        tables.recipes.insert(id, row.clone());
        for kind in [AttrKind::Tag, AttrKind::Ingredient] {
            if let Some(names) = changes.names(kind) {
                tables.set_links(kind, owner, id, names);
            }
        }
        Ok(tables.hydrate(&row))
    }

    async fn set_recipe_image(&self, owner: i64, id: i64, image: &str) -> Result<(Recipe, Option<String>), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.owned_recipe(owner, id)?;
        let row = tables
            .recipes
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("Recipe"))?;
        let previous = row.image.replace(image.to_string());
        let row = row.clone();
        Ok((tables.hydrate(&row), previous))
    }

    async fn delete_recipe(&self, owner: i64, id: i64) -> Result<Recipe, DatabaseError> {
        let mut tables = self.tables.write().await;
        let recipe = tables.hydrate(tables.owned_recipe(owner, id)?);
        tables.recipes.remove(&id);
        tables.recipe_tags.retain(|(r, _)| *r != id);
        tables.recipe_ingredients.retain(|(r, _)| *r != id);
        Ok(recipe)
    }
}
