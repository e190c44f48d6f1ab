//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use std::sync::Arc;

use crate::buffer::ResourceBuffer;
use crate::config::MixerConfig;
use crate::facility::MixerFacility;
use crate::fixed::{f64_to_fixed64, fixed64_to_f64, Fixed64};
use crate::id::Nuclide;
use crate::material::{Composition, Material};
use crate::planner::Stream;
use crate::registry::{RecipeRegistry, RecipeRegistryBuilder};

// ===========================================================================
// Numbers
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    f64_to_fixed64(v)
}

/// Assert a fixed-point value is within 1e-6 of `expected`.
#[track_caller]
pub fn approx_eq(actual: Fixed64, expected: f64) {
    let actual = fixed64_to_f64(actual);
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

// ===========================================================================
// Materials
// ===========================================================================

/// Pure U-238 filler.
pub fn depleted_u(qty: f64) -> Material {
    material(qty, Composition::pure(Nuclide::U238))
}

/// Pure Pu-239 fissile feed.
pub fn separated_pu(qty: f64) -> Material {
    material(qty, Composition::pure(Nuclide::PU239))
}

pub fn material(qty: f64, composition: Composition) -> Material {
    Material::new(fixed(qty), composition).expect("test material must be non-negative")
}

// ===========================================================================
// Registry and facility
// ===========================================================================

/// Registry with `depleted_u`, `separated_pu` and a 10% Pu `mox` target.
pub fn mox_registry() -> Arc<RecipeRegistry> {
    let mut b = RecipeRegistryBuilder::new();
    b.register("depleted_u", Composition::pure(Nuclide::U238)).unwrap();
    b.register("separated_pu", Composition::pure(Nuclide::PU239)).unwrap();
    b.register(
        "mox",
        Composition::from_masses([(Nuclide::U238, fixed(9.0)), (Nuclide::PU239, fixed(1.0))])
            .unwrap(),
    )
    .unwrap();
    Arc::new(b.build())
}

/// Config with 100 kg input buffers and the given throughput and output size.
pub fn mox_config(throughput: f64, out_buf_size: Option<f64>) -> MixerConfig {
    MixerConfig {
        in_buf1_size: Some(100.0),
        in_buf2_size: Some(100.0),
        out_buf_size,
        throughput: Some(throughput),
        in_commod1: "tails".into(),
        in_commod2: "pu".into(),
        out_commod: "mox_fuel".into(),
        in_recipe1: "depleted_u".into(),
        in_recipe2: "separated_pu".into(),
        out_recipe: "mox".into(),
        epsilon: 1e-6,
    }
}

pub fn make_mixer<S>(solver: S, throughput: f64, out_buf_size: Option<f64>) -> MixerFacility<S> {
    MixerFacility::new(&mox_config(throughput, out_buf_size), mox_registry(), solver)
        .expect("test config must validate")
}

/// Push a batch into one of the mixer's input buffers.
pub fn fill<S>(fac: &mut MixerFacility<S>, stream: Stream, batch: Material) {
    fac.input_mut(stream)
        .push(batch)
        .expect("test batch must fit the input buffer");
}
