use crate::id::RecipeId;
use crate::material::Composition;
use std::collections::HashMap;

/// A named recipe: a reference composition resolved once at facility setup
/// and then looked up by id every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDef {
    pub name: String,
    pub composition: Composition,
}

/// Builder for constructing an immutable [`RecipeRegistry`].
/// Two-phase lifecycle: registration -> finalization.
#[derive(Debug, Default)]
pub struct RecipeRegistryBuilder {
    recipes: Vec<RecipeDef>,
    name_to_id: HashMap<String, RecipeId>,
}

impl RecipeRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recipe. Names must be unique.
    pub fn register(
        &mut self,
        name: &str,
        composition: Composition,
    ) -> Result<RecipeId, RegistryError> {
        if self.name_to_id.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(RecipeDef {
            name: name.to_string(),
            composition,
        });
        self.name_to_id.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.name_to_id.get(name).copied()
    }

    /// Finalize into the immutable registry.
    pub fn build(self) -> RecipeRegistry {
        RecipeRegistry {
            recipes: self.recipes,
            name_to_id: self.name_to_id,
        }
    }
}

/// Immutable recipe registry. Frozen after build(). Thread-safe to share.
#[derive(Debug, Clone, Default)]
pub struct RecipeRegistry {
    recipes: Vec<RecipeDef>,
    name_to_id: HashMap<String, RecipeId>,
}

impl RecipeRegistry {
    pub fn get(&self, id: RecipeId) -> Option<&RecipeDef> {
        self.recipes.get(id.0 as usize)
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.name_to_id.get(name).copied()
    }

    /// Resolve a recipe name, failing with [`RegistryError::NotFound`].
    pub fn resolve(&self, name: &str) -> Result<RecipeId, RegistryError> {
        self.recipe_id(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Composition of a registered recipe.
    pub fn composition(&self, id: RecipeId) -> Option<&Composition> {
        self.get(id).map(|r| &r.composition)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("recipe not found: {0}")]
    NotFound(String),
    #[error("duplicate recipe: {0}")]
    Duplicate(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Nuclide;

    fn setup_builder() -> RecipeRegistryBuilder {
        let mut b = RecipeRegistryBuilder::new();
        b.register("depleted_u", Composition::pure(Nuclide::U238)).unwrap();
        b.register("separated_pu", Composition::pure(Nuclide::PU239)).unwrap();
        b
    }

    #[test]
    fn register_and_build() {
        let reg = setup_builder().build();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.recipe_id("depleted_u"), Some(RecipeId(0)));
        assert_eq!(reg.recipe_id("separated_pu"), Some(RecipeId(1)));
    }

    #[test]
    fn composition_lookup() {
        let reg = setup_builder().build();
        let id = reg.resolve("separated_pu").unwrap();
        let comp = reg.composition(id).unwrap();
        assert_eq!(comp.mass_frac(Nuclide::PU239), crate::fixed::Fixed64::ONE);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut b = setup_builder();
        let err = b.register("depleted_u", Composition::pure(Nuclide::U235)).unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("depleted_u".to_string()));
    }

    #[test]
    fn unknown_name_not_found() {
        let reg = setup_builder().build();
        assert_eq!(
            reg.resolve("mox"),
            Err(RegistryError::NotFound("mox".to_string()))
        );
        assert!(reg.get(RecipeId(9)).is_none());
    }
}
