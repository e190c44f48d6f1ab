//! Serde data file structs for recipe definitions.
//!
//! Recipes are deserialized from RON, JSON, or TOML data files and then
//! resolved into core [`Composition`](fuelmix_core::material::Composition)s
//! by the loader. The mixer configuration file deserializes straight into
//! [`MixerConfig`](fuelmix_core::config::MixerConfig).

use std::collections::BTreeMap;

use serde::Deserialize;

/// A recipe definition in a data file.
///
/// `nuclides` maps a nuclide string (`"U235"`, `"pu-239"`, `"922350000"`)
/// to a relative mass. Masses are normalized on load.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    pub nuclides: BTreeMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_from_ron() {
        let src = r#"[(name: "natural_u", nuclides: {"U235": 0.711, "U238": 99.289})]"#;
        let recipes: Vec<RecipeData> = ron::from_str(src).unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].name, "natural_u");
        assert_eq!(recipes[0].nuclides["U235"], 0.711);
    }

    #[test]
    fn recipe_from_toml() {
        let src = r#"
name = "separated_pu"
nuclides = { Pu239 = 94.0, Pu240 = 6.0 }
"#;
        let recipe: RecipeData = toml::from_str(src).unwrap();
        assert_eq!(recipe.nuclides.len(), 2);
        assert_eq!(recipe.nuclides["Pu240"], 6.0);
    }

    #[test]
    fn recipe_missing_nuclides_is_an_error() {
        let result: Result<RecipeData, _> = serde_json::from_str(r#"{"name": "empty"}"#);
        assert!(result.is_err());
    }
}
