//! Data-file loading for the fuelmix mixer.
//!
//! Reads `recipes.{ron,toml,json}` and `mixer.{ron,toml,json}` from a
//! directory and resolves them into a [`RecipeRegistry`](fuelmix_core::registry::RecipeRegistry)
//! and a validated [`MixerConfig`](fuelmix_core::config::MixerConfig).

pub mod loader;
pub mod schema;

pub use loader::{load_mixer_data, DataLoadError, MixerSetup};
