// handlers/mod.rs - two security tiers
//
// Public (no auth) → Protected (token auth, every query scoped to the caller)
pub mod public;
pub mod protected;
