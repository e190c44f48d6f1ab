//! Facility configuration and its validation.
//!
//! [`MixerConfig`] is the serde-facing form: plain numbers and names as they
//! appear in a data file. [`MixerConfig::validate`] checks it against a
//! recipe registry and produces [`MixerSettings`], the resolved form the
//! facility runs on.

use crate::fixed::{f64_to_fixed64, Fixed64, UNBOUNDED};
use crate::id::RecipeId;
use crate::registry::RecipeRegistry;
use serde::{Deserialize, Serialize};

fn default_epsilon() -> f64 {
    1e-6
}

/// Mixer configuration as stored in data files. Capacities and throughput
/// left out (or `null`) are unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerConfig {
    #[serde(default)]
    pub in_buf1_size: Option<f64>,
    #[serde(default)]
    pub in_buf2_size: Option<f64>,
    #[serde(default)]
    pub out_buf_size: Option<f64>,
    /// Maximum mass blended per tick.
    #[serde(default)]
    pub throughput: Option<f64>,
    /// Commodity feeding the filler stream.
    pub in_commod1: String,
    /// Commodity feeding the fissile stream.
    pub in_commod2: String,
    pub out_commod: String,
    pub in_recipe1: String,
    pub in_recipe2: String,
    /// Target recipe the blend is matched to.
    pub out_recipe: String,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

/// Validated, resolved mixer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerSettings {
    pub in_buf1_size: Fixed64,
    pub in_buf2_size: Fixed64,
    pub out_buf_size: Fixed64,
    pub throughput: Fixed64,
    pub epsilon: Fixed64,
    pub in_commod1: String,
    pub in_commod2: String,
    pub out_commod: String,
    pub in_recipe1: RecipeId,
    pub in_recipe2: RecipeId,
    pub out_recipe: RecipeId,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be a non-negative number, got {value}")]
    InvalidQuantity { field: &'static str, value: f64 },
    #[error("epsilon must be positive, got {0}")]
    InvalidEpsilon(f64),
    #[error("{0} must not be empty")]
    EmptyCommodity(&'static str),
    #[error("{field} references unknown recipe '{name}'")]
    UnknownRecipe { field: &'static str, name: String },
}

impl MixerConfig {
    /// Check ranges and names and resolve recipe references.
    pub fn validate(&self, registry: &RecipeRegistry) -> Result<MixerSettings, ConfigError> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }
        for (field, name) in [
            ("in_commod1", &self.in_commod1),
            ("in_commod2", &self.in_commod2),
            ("out_commod", &self.out_commod),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyCommodity(field));
            }
        }

        let recipe = |field: &'static str, name: &str| {
            registry
                .recipe_id(name)
                .ok_or_else(|| ConfigError::UnknownRecipe {
                    field,
                    name: name.to_string(),
                })
        };

        Ok(MixerSettings {
            in_buf1_size: quantity("in_buf1_size", self.in_buf1_size)?,
            in_buf2_size: quantity("in_buf2_size", self.in_buf2_size)?,
            out_buf_size: quantity("out_buf_size", self.out_buf_size)?,
            throughput: quantity("throughput", self.throughput)?,
            epsilon: f64_to_fixed64(self.epsilon).max(Fixed64::from_bits(1)),
            in_commod1: self.in_commod1.clone(),
            in_commod2: self.in_commod2.clone(),
            out_commod: self.out_commod.clone(),
            in_recipe1: recipe("in_recipe1", &self.in_recipe1)?,
            in_recipe2: recipe("in_recipe2", &self.in_recipe2)?,
            out_recipe: recipe("out_recipe", &self.out_recipe)?,
        })
    }
}

/// `None` and positive infinity are unbounded. Values past the fixed-point
/// range saturate.
fn quantity(field: &'static str, value: Option<f64>) -> Result<Fixed64, ConfigError> {
    match value {
        None => Ok(UNBOUNDED),
        Some(v) if v.is_nan() || v < 0.0 => Err(ConfigError::InvalidQuantity { field, value: v }),
        Some(v) => Ok(f64_to_fixed64(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Nuclide;
    use crate::material::Composition;
    use crate::registry::RecipeRegistryBuilder;

    fn registry() -> RecipeRegistry {
        let mut b = RecipeRegistryBuilder::new();
        b.register("depleted_u", Composition::pure(Nuclide::U238)).unwrap();
        b.register("separated_pu", Composition::pure(Nuclide::PU239)).unwrap();
        b.register("mox", Composition::pure(Nuclide::PU239)).unwrap();
        b.build()
    }

    fn config() -> MixerConfig {
        MixerConfig {
            in_buf1_size: Some(100.0),
            in_buf2_size: Some(50.0),
            out_buf_size: None,
            throughput: Some(5.0),
            in_commod1: "tails".into(),
            in_commod2: "pu".into(),
            out_commod: "mox_fuel".into(),
            in_recipe1: "depleted_u".into(),
            in_recipe2: "separated_pu".into(),
            out_recipe: "mox".into(),
            epsilon: 1e-6,
        }
    }

    #[test]
    fn validate_resolves_recipes_and_limits() {
        let s = config().validate(&registry()).unwrap();
        assert_eq!(s.in_recipe1, RecipeId(0));
        assert_eq!(s.out_recipe, RecipeId(2));
        assert_eq!(s.in_buf1_size, f64_to_fixed64(100.0));
        assert_eq!(s.out_buf_size, UNBOUNDED);
        assert_eq!(s.throughput, f64_to_fixed64(5.0));
    }

    #[test]
    fn negative_and_nan_quantities_rejected() {
        let mut c = config();
        c.throughput = Some(-1.0);
        assert!(matches!(
            c.validate(&registry()),
            Err(ConfigError::InvalidQuantity { field: "throughput", .. })
        ));
        let mut c = config();
        c.in_buf2_size = Some(f64::NAN);
        assert!(c.validate(&registry()).is_err());
    }

    #[test]
    fn infinite_capacity_is_unbounded() {
        let mut c = config();
        c.in_buf1_size = Some(f64::INFINITY);
        assert_eq!(c.validate(&registry()).unwrap().in_buf1_size, UNBOUNDED);
    }

    #[test]
    fn bad_epsilon_rejected() {
        let mut c = config();
        c.epsilon = 0.0;
        assert_eq!(c.validate(&registry()), Err(ConfigError::InvalidEpsilon(0.0)));
    }

    #[test]
    fn empty_commodity_rejected() {
        let mut c = config();
        c.out_commod = "  ".into();
        assert_eq!(
            c.validate(&registry()),
            Err(ConfigError::EmptyCommodity("out_commod"))
        );
    }

    #[test]
    fn unknown_recipe_rejected() {
        let mut c = config();
        c.out_recipe = "leu".into();
        assert_eq!(
            c.validate(&registry()),
            Err(ConfigError::UnknownRecipe {
                field: "out_recipe",
                name: "leu".into()
            })
        );
    }

    #[test]
    fn epsilon_defaults_when_missing() {
        let json = r#"{
            "in_commod1": "tails", "in_commod2": "pu", "out_commod": "mox_fuel",
            "in_recipe1": "depleted_u", "in_recipe2": "separated_pu", "out_recipe": "mox",
            "throughput": 5.0
        }"#;
        let c: MixerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.epsilon, 1e-6);
        assert_eq!(c.in_buf1_size, None);
    }
}
