//! Resolution pipeline: reads data files, resolves nuclides and recipe
//! references, builds the recipe registry and validates the mixer config.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers used by [`load_mixer_data`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fuelmix_core::config::{ConfigError, MixerConfig};
use fuelmix_core::facility::{MixerError, MixerFacility};
use fuelmix_core::fixed::f64_to_fixed64;
use fuelmix_core::id::{Nuclide, NuclideParseError, RecipeId};
use fuelmix_core::material::{Composition, ResourceError};
use fuelmix_core::registry::{RecipeRegistry, RecipeRegistryBuilder};
use fuelmix_core::solver::FissileFracSolver;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::schema::RecipeData;

/// Base name of the recipe definitions file.
pub const RECIPES_FILE: &str = "recipes";
/// Base name of the mixer configuration file.
pub const MIXER_FILE: &str = "mixer";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    #[error("recipe '{recipe}' in {file}: {source}")]
    InvalidNuclide {
        file: PathBuf,
        recipe: String,
        #[source]
        source: NuclideParseError,
    },

    #[error("recipe '{recipe}' in {file}: mass of {nuclide} must be finite, got {value}")]
    InvalidMass {
        file: PathBuf,
        recipe: String,
        nuclide: String,
        value: f64,
    },

    #[error("recipe '{recipe}' in {file}: {source}")]
    InvalidRecipe {
        file: PathBuf,
        recipe: String,
        #[source]
        source: ResourceError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, e: impl std::fmt::Display) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: e.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }

    let content = std::fs::read_to_string(path)?;
    let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
        .clone();
    array.try_into().map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Resolution
// ===========================================================================

/// Turn a recipe's nuclide-name -> mass map into a normalized composition.
fn resolve_composition(recipe: &RecipeData, file: &Path) -> Result<Composition, DataLoadError> {
    let mut masses = Vec::with_capacity(recipe.nuclides.len());
    for (key, &mass) in &recipe.nuclides {
        let nuclide: Nuclide = key.parse().map_err(|source| DataLoadError::InvalidNuclide {
            file: file.to_path_buf(),
            recipe: recipe.name.clone(),
            source,
        })?;
        if !mass.is_finite() {
            return Err(DataLoadError::InvalidMass {
                file: file.to_path_buf(),
                recipe: recipe.name.clone(),
                nuclide: key.clone(),
                value: mass,
            });
        }
        masses.push((nuclide, f64_to_fixed64(mass)));
    }
    Composition::from_masses(masses).map_err(|source| DataLoadError::InvalidRecipe {
        file: file.to_path_buf(),
        recipe: recipe.name.clone(),
        source,
    })
}

/// Build the recipe registry, rejecting duplicate names.
pub fn build_registry(
    recipes: &[RecipeData],
    file: &Path,
) -> Result<RecipeRegistry, DataLoadError> {
    let mut builder = RecipeRegistryBuilder::new();
    for recipe in recipes {
        if builder.recipe_id(&recipe.name).is_some() {
            return Err(DataLoadError::DuplicateName {
                file: file.to_path_buf(),
                name: recipe.name.clone(),
            });
        }
        let composition = resolve_composition(recipe, file)?;
        let id = builder
            .register(&recipe.name, composition)
            .map_err(|_| DataLoadError::DuplicateName {
                file: file.to_path_buf(),
                name: recipe.name.clone(),
            })?;
        debug!(recipe = %recipe.name, id = id.0, "registered recipe");
    }
    Ok(builder.build())
}

/// Look up a recipe by name, returning an `UnresolvedRef` error if not found.
pub fn resolve_recipe(
    registry: &RecipeRegistry,
    name: &str,
    file: &Path,
) -> Result<RecipeId, DataLoadError> {
    registry.recipe_id(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind: "recipe",
    })
}

// ===========================================================================
// Loading
// ===========================================================================

/// Everything needed to build a mixer from a data directory.
#[derive(Debug, Clone)]
pub struct MixerSetup {
    pub registry: Arc<RecipeRegistry>,
    pub config: MixerConfig,
}

impl MixerSetup {
    /// Build a facility with default buffers from the loaded data.
    pub fn build_mixer<S: FissileFracSolver>(
        &self,
        solver: S,
    ) -> Result<MixerFacility<S>, MixerError> {
        MixerFacility::new(&self.config, Arc::clone(&self.registry), solver)
    }
}

/// Load `recipes.*` and `mixer.*` from `dir`.
///
/// Recipe references in the mixer config are resolved against the loaded
/// recipes and the config is validated before returning.
pub fn load_mixer_data(dir: &Path) -> Result<MixerSetup, DataLoadError> {
    let recipes_path = require_data_file(dir, RECIPES_FILE)?;
    let recipes: Vec<RecipeData> = deserialize_list(&recipes_path, "recipes")?;
    let registry = build_registry(&recipes, &recipes_path)?;

    let mixer_path = require_data_file(dir, MIXER_FILE)?;
    let config: MixerConfig = deserialize_file(&mixer_path)?;
    for name in [&config.in_recipe1, &config.in_recipe2, &config.out_recipe] {
        resolve_recipe(&registry, name, &mixer_path)?;
    }
    config.validate(&registry)?;

    info!(
        dir = %dir.display(),
        recipes = registry.len(),
        out_recipe = %config.out_recipe,
        "loaded mixer data"
    );

    Ok(MixerSetup {
        registry: Arc::new(registry),
        config,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
