use serde::Serialize;

use crate::config::MediaConfig;
use crate::database::models::{Attr, Recipe, User};

/// Tag or ingredient on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttrView {
    pub id: i64,
    pub name: String,
}

impl From<&Attr> for AttrView {
    fn from(attr: &Attr) -> Self {
        Self {
            id: attr.id,
            name: attr.name.clone(),
        }
    }
}

pub fn attr_views(attrs: &[Attr]) -> Vec<AttrView> {
    attrs.iter().map(AttrView::from).collect()
}

#[derive(Debug, Serialize)]
pub struct RecipeListView {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    /// Fixed two-place decimal string, e.g. "5.25"
    pub price: String,
    pub link: String,
    pub tags: Vec<AttrView>,
    pub ingredients: Vec<AttrView>,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetailView {
    #[serde(flatten)]
    pub summary: RecipeListView,
    pub description: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecipeImageView {
    pub id: i64,
    pub image: Option<String>,
}

/// Which representation an operation answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeView {
    /// Collection listing
    List,
    /// Retrieve, create, update
    Detail,
    /// Image upload
    Image,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RecipeRepr {
    List(RecipeListView),
    Detail(RecipeDetailView),
    Image(RecipeImageView),
}

impl RecipeView {
    pub fn render(self, recipe: &Recipe, media: &MediaConfig) -> RecipeRepr {
        match self {
            RecipeView::List => RecipeRepr::List(summary(recipe)),
            RecipeView::Detail => RecipeRepr::Detail(RecipeDetailView {
                summary: summary(recipe),
                description: recipe.description.clone(),
                image: image_url(recipe, media),
            }),
            RecipeView::Image => RecipeRepr::Image(RecipeImageView {
                id: recipe.id,
                image: image_url(recipe, media),
            }),
        }
    }

    pub fn render_all(self, recipes: &[Recipe], media: &MediaConfig) -> Vec<RecipeRepr> {
        recipes.iter().map(|r| self.render(r, media)).collect()
    }
}

fn summary(recipe: &Recipe) -> RecipeListView {
    RecipeListView {
        id: recipe.id,
        title: recipe.title.clone(),
        time_minutes: recipe.time_minutes,
        price: format!("{:.2}", recipe.price),
        link: recipe.link.clone(),
        tags: attr_views(&recipe.tags),
        ingredients: attr_views(&recipe.ingredients),
    }
}

fn image_url(recipe: &Recipe, media: &MediaConfig) -> Option<String> {
    recipe.image.as_deref().map(|path| media.url_for(path))
}

/// The caller's own profile; the password hash never leaves the store layer
#[derive(Debug, Serialize)]
pub struct UserView {
    pub email: String,
    pub name: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenView {
    pub token: String,
}
