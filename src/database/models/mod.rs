pub mod attr;
pub mod recipe;
pub mod user;

pub use attr::{Attr, AttrKind};
pub use recipe::{Recipe, RecipeChanges, RecipeDraft};
pub use user::{NewUser, User, UserChanges};
