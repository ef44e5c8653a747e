pub mod media;
pub mod recipes;
pub mod users;

pub use media::{ImageError, MediaStorage};
pub use recipes::RecipeService;
pub use users::UserService;
