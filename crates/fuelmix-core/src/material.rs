//! Material batches and their isotopic compositions.
//!
//! A [`Material`] is a quantity of mass with a normalized [`Composition`].
//! Batches only ever change through two operations: [`Resource::absorb`]
//! (mass-weighted merge) and [`Resource::extract_qty`] (proportional split).
//! Neither operation touches isotope ratios beyond weighting them by mass.

use crate::fixed::{DEFAULT_EPSILON, Fixed64};
use crate::id::Nuclide;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from constructing or splitting material.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("cannot extract {requested} kg from a batch of {available} kg")]
    ExtractExceeds {
        requested: Fixed64,
        available: Fixed64,
    },
    #[error("negative quantity: {0}")]
    NegativeQuantity(Fixed64),
    #[error("composition has no mass")]
    EmptyComposition,
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Normalized nuclide -> mass-fraction map. Fractions sum to one (up to
/// fixed-point rounding) unless the composition is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    fractions: BTreeMap<Nuclide, Fixed64>,
}

impl Composition {
    /// Build a composition from raw (unnormalized) masses. Zero entries are
    /// dropped; negative entries and an all-zero input are rejected.
    pub fn from_masses<I>(masses: I) -> Result<Self, ResourceError>
    where
        I: IntoIterator<Item = (Nuclide, Fixed64)>,
    {
        let mut raw: BTreeMap<Nuclide, Fixed64> = BTreeMap::new();
        for (nuc, mass) in masses {
            if mass < Fixed64::ZERO {
                return Err(ResourceError::NegativeQuantity(mass));
            }
            if mass > Fixed64::ZERO {
                *raw.entry(nuc).or_insert(Fixed64::ZERO) += mass;
            }
        }
        let total: Fixed64 = raw.values().copied().sum();
        if total <= Fixed64::ZERO {
            return Err(ResourceError::EmptyComposition);
        }
        let fractions = raw.into_iter().map(|(n, m)| (n, m / total)).collect();
        Ok(Self { fractions })
    }

    /// A composition made of one nuclide only.
    pub fn pure(nuclide: Nuclide) -> Self {
        let mut fractions = BTreeMap::new();
        fractions.insert(nuclide, Fixed64::ONE);
        Self { fractions }
    }

    /// Mass fraction of `nuclide` (zero if absent).
    pub fn mass_frac(&self, nuclide: Nuclide) -> Fixed64 {
        self.fractions.get(&nuclide).copied().unwrap_or(Fixed64::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Nuclide, Fixed64)> + '_ {
        self.fractions.iter().map(|(&n, &f)| (n, f))
    }

    /// Mass-weighted mix of two compositions. Weights are the masses of each
    /// side; a side with zero weight contributes nothing.
    pub fn mix(&self, weight: Fixed64, other: &Composition, other_weight: Fixed64) -> Composition {
        let total = weight + other_weight;
        if total <= Fixed64::ZERO {
            return self.clone();
        }
        if other_weight <= Fixed64::ZERO {
            return self.clone();
        }
        if weight <= Fixed64::ZERO {
            return other.clone();
        }
        let w_self = weight / total;
        let w_other = Fixed64::ONE - w_self;

        let mut fractions = BTreeMap::new();
        for (&n, &f) in &self.fractions {
            *fractions.entry(n).or_insert(Fixed64::ZERO) += f * w_self;
        }
        for (&n, &f) in &other.fractions {
            *fractions.entry(n).or_insert(Fixed64::ZERO) += f * w_other;
        }
        fractions.retain(|_, f| *f > Fixed64::ZERO);
        Composition { fractions }
    }
}

// ---------------------------------------------------------------------------
// Resource trait
// ---------------------------------------------------------------------------

/// A batch of resource the mixer can merge and split.
///
/// The mixer only needs these four capabilities; hosts may back them with
/// handles, shared pointers or plain values.
pub trait Resource: Sized {
    /// Mass of the batch.
    fn quantity(&self) -> Fixed64;

    fn composition(&self) -> &Composition;

    /// Merge `other` into `self`. Total mass is the sum of both; the
    /// composition is their mass-weighted combination.
    fn absorb(&mut self, other: Self);

    /// Split off `qty` of mass with the same composition, leaving the
    /// remainder in `self`.
    fn extract_qty(&mut self, qty: Fixed64) -> Result<Self, ResourceError>;
}

// ---------------------------------------------------------------------------
// Material
// ---------------------------------------------------------------------------

/// A batch of nuclear material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    quantity: Fixed64,
    composition: Composition,
}

impl Material {
    pub fn new(quantity: Fixed64, composition: Composition) -> Result<Self, ResourceError> {
        if quantity < Fixed64::ZERO {
            return Err(ResourceError::NegativeQuantity(quantity));
        }
        Ok(Self {
            quantity,
            composition,
        })
    }

    /// Mass fraction of `nuclide` in this batch.
    pub fn mass_frac(&self, nuclide: Nuclide) -> Fixed64 {
        self.composition.mass_frac(nuclide)
    }
}

impl Resource for Material {
    fn quantity(&self) -> Fixed64 {
        self.quantity
    }

    fn composition(&self) -> &Composition {
        &self.composition
    }

    fn absorb(&mut self, other: Material) {
        self.composition = self
            .composition
            .mix(self.quantity, &other.composition, other.quantity);
        self.quantity += other.quantity;
    }

    fn extract_qty(&mut self, qty: Fixed64) -> Result<Material, ResourceError> {
        if qty < Fixed64::ZERO {
            return Err(ResourceError::NegativeQuantity(qty));
        }
        if qty - self.quantity > DEFAULT_EPSILON {
            return Err(ResourceError::ExtractExceeds {
                requested: qty,
                available: self.quantity,
            });
        }
        // Overshoot within tolerance takes the whole batch.
        let taken = qty.min(self.quantity);
        self.quantity -= taken;
        Ok(Material {
            quantity: taken,
            composition: self.composition.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_fixed64 as fixed;

    fn close(a: Fixed64, b: f64) -> bool {
        (a.to_num::<f64>() - b).abs() < 1e-6
    }

    #[test]
    fn from_masses_normalizes() {
        let comp = Composition::from_masses([
            (Nuclide::U235, fixed(1.0)),
            (Nuclide::U238, fixed(3.0)),
        ])
        .unwrap();
        assert!(close(comp.mass_frac(Nuclide::U235), 0.25));
        assert!(close(comp.mass_frac(Nuclide::U238), 0.75));
        assert_eq!(comp.mass_frac(Nuclide::PU239), Fixed64::ZERO);
    }

    #[test]
    fn from_masses_rejects_empty_and_negative() {
        assert_eq!(
            Composition::from_masses([(Nuclide::U235, Fixed64::ZERO)]),
            Err(ResourceError::EmptyComposition)
        );
        assert!(matches!(
            Composition::from_masses([(Nuclide::U235, fixed(-1.0))]),
            Err(ResourceError::NegativeQuantity(_))
        ));
    }

    #[test]
    fn absorb_is_mass_weighted() {
        let mut a = Material::new(fixed(3.0), Composition::pure(Nuclide::U238)).unwrap();
        let b = Material::new(fixed(1.0), Composition::pure(Nuclide::PU239)).unwrap();
        a.absorb(b);
        assert_eq!(a.quantity(), fixed(4.0));
        assert!(close(a.mass_frac(Nuclide::U238), 0.75));
        assert!(close(a.mass_frac(Nuclide::PU239), 0.25));
    }

    #[test]
    fn absorb_into_empty_takes_other_composition() {
        let mut a = Material::new(Fixed64::ZERO, Composition::pure(Nuclide::U238)).unwrap();
        let b = Material::new(fixed(2.0), Composition::pure(Nuclide::U235)).unwrap();
        a.absorb(b);
        assert_eq!(a.quantity(), fixed(2.0));
        assert_eq!(a.mass_frac(Nuclide::U235), Fixed64::ONE);
        assert_eq!(a.mass_frac(Nuclide::U238), Fixed64::ZERO);
    }

    #[test]
    fn extract_keeps_composition() {
        let comp = Composition::from_masses([
            (Nuclide::U235, fixed(1.0)),
            (Nuclide::U238, fixed(1.0)),
        ])
        .unwrap();
        let mut m = Material::new(fixed(10.0), comp.clone()).unwrap();
        let piece = m.extract_qty(fixed(3.5)).unwrap();
        assert_eq!(piece.quantity(), fixed(3.5));
        assert_eq!(m.quantity(), fixed(6.5));
        assert_eq!(piece.composition(), &comp);
        assert_eq!(m.composition(), &comp);
    }

    #[test]
    fn extract_rejects_overdraw() {
        let mut m = Material::new(fixed(1.0), Composition::pure(Nuclide::U238)).unwrap();
        let err = m.extract_qty(fixed(2.0)).unwrap_err();
        assert!(matches!(err, ResourceError::ExtractExceeds { .. }));
        assert_eq!(m.quantity(), fixed(1.0));
    }

    #[test]
    fn extract_within_tolerance_takes_everything() {
        let mut m = Material::new(fixed(1.0), Composition::pure(Nuclide::U238)).unwrap();
        let over = fixed(1.0) + Fixed64::from_bits(10);
        let piece = m.extract_qty(over).unwrap();
        assert_eq!(piece.quantity(), fixed(1.0));
        assert_eq!(m.quantity(), Fixed64::ZERO);
    }

    #[test]
    fn negative_material_is_rejected() {
        assert!(Material::new(fixed(-0.5), Composition::pure(Nuclide::U238)).is_err());
    }
}
