use crate::api::payload::RecipePayload;
use crate::database::models::Recipe;
use crate::database::Store;
use crate::error::ApiError;

use super::media::{validate_image, ImageError, MediaStorage};

/// Recipe writes that touch more than the store: payload validation and
/// the image files that belong to a recipe
pub struct RecipeService<'a> {
    store: &'a dyn Store,
    media: MediaStorage,
}

impl<'a> RecipeService<'a> {
    pub fn new(store: &'a dyn Store, media: MediaStorage) -> Self {
        Self { store, media }
    }

    pub async fn create(&self, owner: i64, payload: RecipePayload) -> Result<Recipe, ApiError> {
        let draft = payload.into_draft()?;
        let recipe = self.store.create_recipe(owner, draft).await?;
        tracing::debug!("User {} created recipe {}", owner, recipe.id);
        Ok(recipe)
    }

    /// `partial` is PATCH; PUT requires title, time_minutes and price
    pub async fn update(&self, owner: i64, id: i64, payload: RecipePayload, partial: bool) -> Result<Recipe, ApiError> {
        // Unknown or foreign ids are a 404 before any payload error
        self.store.get_recipe(owner, id).await?;
        let changes = payload.validate(!partial)?;
        Ok(self.store.update_recipe(owner, id, changes).await?)
    }

    pub async fn delete(&self, owner: i64, id: i64) -> Result<(), ApiError> {
        let recipe = self.store.delete_recipe(owner, id).await?;
        if let Some(image) = &recipe.image {
            self.media.remove(image).await;
        }
        Ok(())
    }

    /// Validate, store and attach a new image. The previous file is removed
    /// only after the new one is attached; a rejected upload changes nothing.
    pub async fn upload_image(&self, owner: i64, id: i64, upload: Option<Vec<u8>>) -> Result<Recipe, ApiError> {
        self.store.get_recipe(owner, id).await?;

        let bytes = upload.ok_or(ImageError::Missing)?;
        let (bytes, format) = tokio::task::spawn_blocking(move || {
            let format = validate_image(&bytes)?;
            Ok::<_, ImageError>((bytes, format))
        })
        .await??;

        let relative_path = self.media.save_recipe_image(&bytes, format).await?;
        let (recipe, previous) = match self.store.set_recipe_image(owner, id, &relative_path).await {
            Ok(result) => result,
            Err(e) => {
                self.media.remove(&relative_path).await;
                return Err(e.into());
            }
        };
        if let Some(previous) = previous {
            self.media.remove(&previous).await;
        }
        Ok(recipe)
    }
}
