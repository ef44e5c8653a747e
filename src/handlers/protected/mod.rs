pub mod attrs;
pub mod recipes;
pub mod user;
