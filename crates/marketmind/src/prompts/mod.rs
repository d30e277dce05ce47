//! Prompt templates for the reasoning-backed stages
//!
//! - `system`: persona prompts, one per stage; each contains a distinct
//!   phrase scripted providers can route on
//! - `user`: minijinja templates carrying the stage data and the JSON schema
//!   expected back

mod system;
mod user;

pub use system::*;
pub use user::*;
