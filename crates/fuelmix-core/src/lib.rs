//! Fuelmix Core -- a recipe-mixing facility for fuel-cycle simulations.
//!
//! The facility blends a filler stream and a fissile stream into an output
//! stream whose fissile fraction matches a target recipe, within throughput
//! and buffer-capacity limits. All quantities are deterministic fixed-point
//! masses.
//!
//! # Per-Tick Pipeline
//!
//! Each call to [`facility::MixerFacility::tick`]:
//!
//! 1. **Check** -- Idle if an input is empty or the output has no room.
//! 2. **Merge** -- Pop each input buffer and absorb its batches into one.
//! 3. **Solve** -- Ask the [`solver::FissileFracSolver`] what fraction of the
//!    blend must be fissile. A negative answer restores both inputs.
//! 4. **Plan** -- [`planner::plan_blend`] sizes the blend against throughput,
//!    output space and input stock.
//! 5. **Apply** -- Extract, combine, push the blend and any remainders.
//!
//! # Key Types
//!
//! - [`facility::MixerFacility`] -- Owns the buffers and runs ticks.
//! - [`planner::BlendPlan`] -- The per-tick arithmetic result.
//! - [`material::Material`] / [`material::Resource`] -- Batches of mass with
//!   a [`material::Composition`].
//! - [`buffer::ResBuf`] / [`buffer::ResourceBuffer`] -- Capacity-limited queues.
//! - [`registry::RecipeRegistry`] -- Immutable named compositions.
//! - [`event::EventBus`] -- Typed mixer events with ring-buffer storage.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod buffer;
pub mod config;
pub mod event;
pub mod facility;
pub mod fixed;
pub mod id;
pub mod material;
pub mod planner;
pub mod registry;
pub mod solver;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
