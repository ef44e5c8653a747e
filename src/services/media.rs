use image::ImageFormat;
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::MediaConfig;

const RECIPE_UPLOAD_DIR: &str = "uploads/recipe";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("no file was submitted")]
    Missing,

    #[error("the submitted file is empty")]
    Empty,

    #[error("not a valid image: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Detect the format from the content and fully decode it; the client's
/// filename and content type are never trusted.
pub fn validate_image(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    let format = image::guess_format(bytes).map_err(|e| ImageError::Invalid(e.to_string()))?;
    image::load_from_memory_with_format(bytes, format).map_err(|e| ImageError::Invalid(e.to_string()))?;
    Ok(format)
}

fn extension(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("img")
}

/// Uploaded files below the configured media root
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
        }
    }

    pub fn path_of(&self, relative_path: &str) -> PathBuf {
        self.root.join(relative_path)
    }

    /// Write a validated recipe image under a fresh unique name and return its
    /// path relative to the media root
    pub async fn save_recipe_image(&self, bytes: &[u8], format: ImageFormat) -> Result<String, ImageError> {
        let relative_path = format!("{}/{}.{}", RECIPE_UPLOAD_DIR, Uuid::new_v4(), extension(format));
        let path = self.path_of(&relative_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("Stored recipe image at {}", path.display());
        Ok(relative_path)
    }

    /// Best effort; a missing file is not an error
    pub async fn remove(&self, relative_path: &str) {
        let path = self.path_of(relative_path);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!("Removed media file {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove media file {}: {}", path.display(), e),
        }
    }
}
