//! Prompt construction for both loops.
//!
//! Templates are data: the defaults here are registered at construction and
//! can be replaced through `register_template` without touching loop code.

mod render;
pub mod templates;

pub use render::PromptRenderer;
