use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::attr::{Attr, AttrKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    /// Path relative to the media root
    pub image: Option<String>,
    #[sqlx(skip)]
    pub tags: Vec<Attr>,
    #[sqlx(skip)]
    pub ingredients: Vec<Attr>,
}

impl Recipe {
    pub fn attrs(&self, kind: AttrKind) -> &[Attr] {
        match kind {
            AttrKind::Tag => &self.tags,
            AttrKind::Ingredient => &self.ingredients,
        }
    }

    pub fn attrs_mut(&mut self, kind: AttrKind) -> &mut Vec<Attr> {
        match kind {
            AttrKind::Tag => &mut self.tags,
            AttrKind::Ingredient => &mut self.ingredients,
        }
    }
}

/// A validated new recipe; tag and ingredient entries are names resolved
/// with get-or-create under the recipe owner
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

/// A validated update. `tags`/`ingredients` of `Some` replace the whole
/// association set, `Some(vec![])` clears it.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeChanges {
    pub fn names(&self, kind: AttrKind) -> Option<&[String]> {
        match kind {
            AttrKind::Tag => self.tags.as_deref(),
            AttrKind::Ingredient => self.ingredients.as_deref(),
        }
    }

    /// Copy the scalar columns that are present onto `recipe`
    pub fn apply_fields(&self, recipe: &mut Recipe) {
        if let Some(title) = &self.title {
            recipe.title = title.clone();
        }
        if let Some(description) = &self.description {
            recipe.description = description.clone();
        }
        if let Some(time_minutes) = self.time_minutes {
            recipe.time_minutes = time_minutes;
        }
        if let Some(price) = self.price {
            recipe.price = price;
        }
        if let Some(link) = &self.link {
            recipe.link = link.clone();
        }
    }
}

impl RecipeDraft {
    pub fn names(&self, kind: AttrKind) -> &[String] {
        match kind {
            AttrKind::Tag => &self.tags,
            AttrKind::Ingredient => &self.ingredients,
        }
    }
}
