use crate::fixed::Fixed64;
use crate::material::Composition;

/// Computes the fraction of blend mass that must come from the fissile
/// stream for the blend to match `target`.
///
/// Implementations return a value in `[0, 1]` on success. Any negative value
/// means no ratio reaches the target (the fissile stream is not reactive
/// enough); the mixer then skips the tick.
pub trait FissileFracSolver {
    fn fissile_frac(
        &self,
        target: &Composition,
        filler: &Composition,
        fissile: &Composition,
    ) -> Fixed64;
}

impl<F> FissileFracSolver for F
where
    F: Fn(&Composition, &Composition, &Composition) -> Fixed64,
{
    fn fissile_frac(
        &self,
        target: &Composition,
        filler: &Composition,
        fissile: &Composition,
    ) -> Fixed64 {
        self(target, filler, fissile)
    }
}

/// A solver that always returns the same fraction, regardless of the
/// compositions involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFraction(pub Fixed64);

impl FixedFraction {
    /// A solver that always reports the blend as infeasible.
    pub fn infeasible() -> Self {
        Self(-Fixed64::ONE)
    }
}

impl FissileFracSolver for FixedFraction {
    fn fissile_frac(
        &self,
        _target: &Composition,
        _filler: &Composition,
        _fissile: &Composition,
    ) -> Fixed64 {
        self.0
    }
}
