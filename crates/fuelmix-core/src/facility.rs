//! The recipe-mixing facility.
//!
//! A [`MixerFacility`] owns two input buffers (filler and fissile), one
//! output buffer, its validated settings and a fissile-fraction solver. The
//! host calls [`MixerFacility::tick`] once per time step; between ticks the
//! exchange layer fills the inputs and drains the output through the buffer
//! accessors.
//!
//! # Tick sequence
//!
//! 1. Idle if either input is empty or the output has no room.
//! 2. Pop and merge each input buffer into one batch.
//! 3. Ask the solver for the fissile fraction of the target recipe. A
//!    negative answer restores both inputs untouched and skips the tick.
//! 4. Plan the blend against throughput, output space and input stock.
//! 5. Extract and combine the planned masses, push the blend to the output
//!    and push any non-empty remainders back to their inputs.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::buffer::{BufferError, ResBuf, ResourceBuffer};
use crate::config::{ConfigError, MixerConfig, MixerSettings};
use crate::event::{EventBus, MixerEvent};
use crate::fixed::{Fixed64, Ticks};
use crate::id::{Nuclide, RecipeId};
use crate::material::{Composition, Material, Resource, ResourceError};
use crate::planner::{
    check_ready, mix, plan_blend, BlendDecision, BlendLimits, BlendPlan, StallReason, Stream,
};
use crate::registry::{RecipeRegistry, RegistryError};
use crate::solver::FissileFracSolver;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MixerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ---------------------------------------------------------------------------
// State and outcomes
// ---------------------------------------------------------------------------

/// Runtime state of the mixer, updated every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MixerState {
    #[default]
    Idle,
    Mixing,
    Stalled { reason: StallReason },
}

/// What a mixing tick produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixReport {
    pub plan: BlendPlan,
    /// Composition of the blend pushed to the output buffer.
    pub composition: Composition,
}

impl MixReport {
    pub fn mass_frac(&self, nuclide: Nuclide) -> Fixed64 {
        self.composition.mass_frac(nuclide)
    }
}

/// The outcome of one call to [`MixerFacility::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixOutcome {
    Idle(StallReason),
    /// The solver found no feasible ratio; inputs were restored.
    Infeasible { fissile_frac: Fixed64 },
    Mixed(MixReport),
}

impl MixOutcome {
    /// Mass blended this tick; zero unless the tick mixed.
    pub fn blend_quantity(&self) -> Fixed64 {
        match self {
            MixOutcome::Mixed(report) => report.plan.blend_quantity,
            _ => Fixed64::ZERO,
        }
    }
}

/// What an input stream would request from the exchange layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputDemand<'a> {
    pub stream: Stream,
    pub commodity: &'a str,
    pub recipe: RecipeId,
    /// Free space in the stream's buffer.
    pub quantity: Fixed64,
}

/// What the output stream can offer to the exchange layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOffer<'a> {
    pub commodity: &'a str,
    pub quantity: Fixed64,
}

// ---------------------------------------------------------------------------
// Facility
// ---------------------------------------------------------------------------

/// A facility that blends a filler and a fissile stream to a target recipe.
#[derive(Debug)]
pub struct MixerFacility<S, B = ResBuf<Material>> {
    settings: MixerSettings,
    registry: Arc<RecipeRegistry>,
    solver: S,
    filler: B,
    fissile: B,
    output: B,
    state: MixerState,
    tick: Ticks,
    events: EventBus,
}

impl<S> MixerFacility<S, ResBuf<Material>> {
    /// Build a facility with default buffers sized from `config`.
    pub fn new(
        config: &MixerConfig,
        registry: Arc<RecipeRegistry>,
        solver: S,
    ) -> Result<Self, MixerError> {
        let settings = config.validate(&registry)?;
        let filler = ResBuf::new(settings.in_buf1_size)?;
        let fissile = ResBuf::new(settings.in_buf2_size)?;
        let output = ResBuf::new(settings.out_buf_size)?;
        Ok(Self::from_parts(settings, registry, solver, [filler, fissile, output]))
    }
}

impl<S, B> MixerFacility<S, B> {
    /// Build a facility around host-provided buffers, in the order
    /// `[filler, fissile, output]`. Capacities come from the buffers.
    pub fn with_buffers(
        config: &MixerConfig,
        registry: Arc<RecipeRegistry>,
        solver: S,
        buffers: [B; 3],
    ) -> Result<Self, MixerError> {
        let settings = config.validate(&registry)?;
        Ok(Self::from_parts(settings, registry, solver, buffers))
    }

    fn from_parts(
        settings: MixerSettings,
        registry: Arc<RecipeRegistry>,
        solver: S,
        buffers: [B; 3],
    ) -> Self {
        let [filler, fissile, output] = buffers;
        Self {
            settings,
            registry,
            solver,
            filler,
            fissile,
            output,
            state: MixerState::Idle,
            tick: 0,
            events: EventBus::default(),
        }
    }

    pub fn settings(&self) -> &MixerSettings {
        &self.settings
    }

    pub fn state(&self) -> MixerState {
        self.state
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> Ticks {
        self.tick
    }

    pub fn input(&self, stream: Stream) -> &B {
        match stream {
            Stream::Filler => &self.filler,
            Stream::Fissile => &self.fissile,
        }
    }

    pub fn input_mut(&mut self, stream: Stream) -> &mut B {
        match stream {
            Stream::Filler => &mut self.filler,
            Stream::Fissile => &mut self.fissile,
        }
    }

    pub fn output(&self) -> &B {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut B {
        &mut self.output
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    fn set_state(&mut self, new_state: MixerState) {
        if self.state == new_state {
            return;
        }
        match new_state {
            MixerState::Stalled { reason } => self.events.emit(MixerEvent::Stalled {
                reason,
                tick: self.tick,
            }),
            MixerState::Mixing if matches!(self.state, MixerState::Stalled { .. }) => {
                self.events.emit(MixerEvent::Resumed { tick: self.tick })
            }
            _ => {}
        }
        self.state = new_state;
    }
}

impl<S, B> MixerFacility<S, B>
where
    S: FissileFracSolver,
    B: ResourceBuffer,
    B::Item: Clone,
{
    /// What each input stream would request this tick.
    pub fn input_demands(&self) -> [InputDemand<'_>; 2] {
        [
            InputDemand {
                stream: Stream::Filler,
                commodity: &self.settings.in_commod1,
                recipe: self.settings.in_recipe1,
                quantity: self.filler.space(),
            },
            InputDemand {
                stream: Stream::Fissile,
                commodity: &self.settings.in_commod2,
                recipe: self.settings.in_recipe2,
                quantity: self.fissile.space(),
            },
        ]
    }

    /// What the output stream can offer this tick.
    pub fn output_offer(&self) -> OutputOffer<'_> {
        OutputOffer {
            commodity: &self.settings.out_commod,
            quantity: self.output.quantity(),
        }
    }

    /// Run one time step.
    pub fn tick(&mut self) -> Result<MixOutcome, MixerError> {
        let outcome = self.run_tick();
        self.tick += 1;
        outcome
    }

    fn run_tick(&mut self) -> Result<MixOutcome, MixerError> {
        let filler_qty = self.filler.quantity();
        let fissile_qty = self.fissile.quantity();
        debug!(
            tick = self.tick,
            filler = %filler_qty,
            fissile = %fissile_qty,
            output = %self.output.quantity(),
            "mixer ticking"
        );

        let limits = BlendLimits {
            throughput: self.settings.throughput,
            output_space: self.output.space(),
            epsilon: self.settings.epsilon,
        };
        if let Some(reason) = check_ready(filler_qty, fissile_qty, &limits) {
            self.set_state(MixerState::Stalled { reason });
            return Ok(MixOutcome::Idle(reason));
        }

        // Resolve the target before anything leaves the buffers.
        let registry = Arc::clone(&self.registry);
        let target_id = self.settings.out_recipe;
        let target = registry
            .composition(target_id)
            .ok_or_else(|| RegistryError::NotFound(format!("{target_id:?}")))?;

        let filler_batches = self.filler.pop_all();
        let fissile_batches = self.fissile.pop_all();
        let merged = (
            merge(filler_batches.iter().cloned()),
            merge(fissile_batches.iter().cloned()),
        );
        let (mut filler, mut fissile) = match merged {
            (Some(filler), Some(fissile)) => (filler, fissile),
            (filler, _) => {
                // A buffer reported stock but popped nothing.
                let reason = if filler.is_none() {
                    StallReason::MissingFiller
                } else {
                    StallReason::MissingFissile
                };
                self.restore(filler_batches, fissile_batches)?;
                self.set_state(MixerState::Stalled { reason });
                return Ok(MixOutcome::Idle(reason));
            }
        };

        let fissile_frac = self
            .solver
            .fissile_frac(target, filler.composition(), fissile.composition());

        let plan = match plan_blend(filler.quantity(), fissile.quantity(), fissile_frac, &limits) {
            BlendDecision::Blend(plan) => plan,
            BlendDecision::Idle(reason) => {
                self.restore(filler_batches, fissile_batches)?;
                self.set_state(MixerState::Stalled { reason });
                return Ok(MixOutcome::Idle(reason));
            }
            BlendDecision::Infeasible { fissile_frac } => {
                self.restore(filler_batches, fissile_batches)?;
                warn!(
                    tick = self.tick,
                    fissile_frac = %fissile_frac,
                    commodity = %self.settings.in_commod2,
                    "fissile stream has too low reactivity"
                );
                self.events.emit(MixerEvent::BlendInfeasible {
                    fissile_frac,
                    tick: self.tick,
                });
                self.set_state(MixerState::Stalled {
                    reason: StallReason::InfeasibleBlend,
                });
                return Ok(MixOutcome::Infeasible { fissile_frac });
            }
        };
        debug!(filler_frac = %plan.frac1, fissile_frac = %plan.frac2, "blend fractions");

        // Until the blend is in the output buffer, any failure puts the
        // popped batches back untouched.
        let pushed = mix(&mut filler, &mut fissile, &plan)
            .map_err(MixerError::from)
            .and_then(|blend| {
                let composition = blend.composition().clone();
                let quantity = blend.quantity();
                self.output.push(blend)?;
                Ok((composition, quantity))
            });
        let (composition, mixed) = match pushed {
            Ok(done) => done,
            Err(e) => {
                self.restore(filler_batches, fissile_batches)?;
                return Err(e);
            }
        };

        if filler.quantity() > Fixed64::ZERO {
            self.filler.push(filler)?;
        }
        if fissile.quantity() > Fixed64::ZERO {
            self.fissile.push(fissile)?;
        }

        if let Some(stream) = plan.binding {
            let commodity = match stream {
                Stream::Filler => &self.settings.in_commod1,
                Stream::Fissile => &self.settings.in_commod2,
            };
            info!(
                commodity = %commodity,
                from = %plan.requested,
                to = %plan.blend_quantity,
                "constrained by input commodity, reducing blend quantity"
            );
            self.events.emit(MixerEvent::Constrained {
                stream,
                requested: plan.requested,
                reduced_to: plan.blend_quantity,
                tick: self.tick,
            });
        }
        info!(
            mixed = %mixed,
            u238 = %composition.mass_frac(Nuclide::U238),
            u235 = %composition.mass_frac(Nuclide::U235),
            pu239 = %composition.mass_frac(Nuclide::PU239),
            "mixed to recipe"
        );

        self.set_state(MixerState::Mixing);
        self.events.emit(MixerEvent::Mixed {
            quantity: plan.blend_quantity,
            filler_frac: plan.frac1,
            fissile_frac: plan.frac2,
            tick: self.tick,
        });

        Ok(MixOutcome::Mixed(MixReport { plan, composition }))
    }

    /// Put popped batches back in their original order.
    fn restore(&mut self, filler: Vec<B::Item>, fissile: Vec<B::Item>) -> Result<(), BufferError> {
        for batch in filler {
            self.filler.push(batch)?;
        }
        for batch in fissile {
            self.fissile.push(batch)?;
        }
        Ok(())
    }
}

/// Merge batches into one by absorbing each into the first.
fn merge<R: Resource>(batches: impl IntoIterator<Item = R>) -> Option<R> {
    let mut iter = batches.into_iter();
    let mut merged = iter.next()?;
    for batch in iter {
        merged.absorb(batch);
    }
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::fixed::f64_to_fixed64 as fixed;
    use crate::solver::FixedFraction;
    use crate::test_utils::*;

    /// Host buffer that can refuse every push or report stock it does not hold.
    #[derive(Debug)]
    struct HostBuf {
        inner: ResBuf<Material>,
        refuse_pushes: bool,
        phantom: Fixed64,
    }

    impl HostBuf {
        fn open() -> Self {
            Self {
                inner: ResBuf::unbounded(),
                refuse_pushes: false,
                phantom: Fixed64::ZERO,
            }
        }

        fn refusing() -> Self {
            Self {
                refuse_pushes: true,
                ..Self::open()
            }
        }

        fn phantom(qty: f64) -> Self {
            Self {
                phantom: fixed(qty),
                ..Self::open()
            }
        }
    }

    impl ResourceBuffer for HostBuf {
        type Item = Material;

        fn quantity(&self) -> Fixed64 {
            self.inner.quantity() + self.phantom
        }

        fn space(&self) -> Fixed64 {
            self.inner.space()
        }

        fn pop_all(&mut self) -> Vec<Material> {
            self.inner.pop_all()
        }

        fn push(&mut self, item: Material) -> Result<(), BufferError> {
            if self.refuse_pushes {
                return Err(BufferError::Overflow {
                    quantity: item.quantity(),
                    space: Fixed64::ZERO,
                });
            }
            self.inner.push(item)
        }
    }

    fn host_mixer(buffers: [HostBuf; 3]) -> MixerFacility<FixedFraction, HostBuf> {
        MixerFacility::with_buffers(
            &mox_config(5.0, None),
            mox_registry(),
            FixedFraction(fixed(0.3)),
            buffers,
        )
        .unwrap()
    }

    #[test]
    fn merge_absorbs_all_batches() {
        let merged = merge(vec![depleted_u(1.0), depleted_u(2.0), separated_pu(1.0)]).unwrap();
        assert_eq!(merged.quantity(), fixed(4.0));
        approx_eq(merged.mass_frac(Nuclide::PU239), 0.25);
        assert!(merge(Vec::<Material>::new()).is_none());
    }

    #[test]
    fn input_demands_report_buffer_space() {
        let mut fac = make_mixer(FixedFraction(fixed(0.3)), 5.0, None);
        fill(&mut fac, Stream::Filler, depleted_u(40.0));
        let [filler, fissile] = fac.input_demands();
        assert_eq!(filler.commodity, "tails");
        assert_eq!(filler.quantity, fixed(60.0));
        assert_eq!(fissile.commodity, "pu");
        assert_eq!(fissile.quantity, fixed(100.0));
        assert_eq!(fac.output_offer().commodity, "mox_fuel");
        assert_eq!(fac.output_offer().quantity, Fixed64::ZERO);
    }

    #[test]
    fn stall_events_fire_on_transition_only() {
        let mut fac = make_mixer(FixedFraction(fixed(0.3)), 5.0, None);
        fac.tick().unwrap();
        fac.tick().unwrap();
        assert_eq!(fac.events().buffered_count(EventKind::Stalled), 1);
        assert_eq!(
            fac.state(),
            MixerState::Stalled {
                reason: StallReason::MissingFiller
            }
        );

        fill(&mut fac, Stream::Filler, depleted_u(10.0));
        fill(&mut fac, Stream::Fissile, separated_pu(10.0));
        fac.tick().unwrap();
        assert_eq!(fac.state(), MixerState::Mixing);
        assert_eq!(fac.events().buffered_count(EventKind::Resumed), 1);
        assert_eq!(fac.events().buffered_count(EventKind::Mixed), 1);
        assert_eq!(fac.ticks(), 3);
    }

    #[test]
    fn infeasible_tick_emits_event_and_restores_batches() {
        let mut fac = make_mixer(FixedFraction::infeasible(), 5.0, None);
        fill(&mut fac, Stream::Filler, depleted_u(4.0));
        fill(&mut fac, Stream::Filler, depleted_u(6.0));
        fill(&mut fac, Stream::Fissile, separated_pu(10.0));

        let outcome = fac.tick().unwrap();
        assert_eq!(
            outcome,
            MixOutcome::Infeasible {
                fissile_frac: -Fixed64::ONE
            }
        );
        assert_eq!(fac.input(Stream::Filler).count(), 2);
        assert_eq!(fac.input(Stream::Filler).quantity(), fixed(10.0));
        assert_eq!(fac.input(Stream::Fissile).quantity(), fixed(10.0));
        assert_eq!(fac.events().buffered_count(EventKind::BlendInfeasible), 1);
        assert_eq!(
            fac.state(),
            MixerState::Stalled {
                reason: StallReason::InfeasibleBlend
            }
        );
    }

    #[test]
    fn constrained_event_names_binding_stream() {
        let mut fac = make_mixer(FixedFraction(fixed(0.3)), 5.0, None);
        fill(&mut fac, Stream::Filler, depleted_u(2.0));
        fill(&mut fac, Stream::Fissile, separated_pu(10.0));
        fac.tick().unwrap();

        let buf = fac.events().buffer(EventKind::Constrained).unwrap();
        let event = buf.iter().next().unwrap();
        assert!(matches!(
            event,
            MixerEvent::Constrained {
                stream: Stream::Filler,
                tick: 0,
                ..
            }
        ));
    }

    #[test]
    fn failed_output_push_restores_inputs() {
        let mut fac = host_mixer([HostBuf::open(), HostBuf::open(), HostBuf::refusing()]);
        fac.input_mut(Stream::Filler).push(depleted_u(4.0)).unwrap();
        fac.input_mut(Stream::Filler).push(depleted_u(6.0)).unwrap();
        fac.input_mut(Stream::Fissile).push(separated_pu(10.0)).unwrap();

        let err = fac.tick().unwrap_err();
        assert!(matches!(err, MixerError::Buffer(BufferError::Overflow { .. })));

        assert_eq!(fac.input(Stream::Filler).quantity(), fixed(10.0));
        assert_eq!(fac.input(Stream::Filler).inner.count(), 2);
        assert_eq!(fac.input(Stream::Fissile).quantity(), fixed(10.0));
        assert_eq!(fac.output().quantity(), Fixed64::ZERO);
        assert_eq!(fac.events().buffered_count(EventKind::Mixed), 0);
        assert_eq!(fac.events().buffered_count(EventKind::Constrained), 0);
    }

    #[test]
    fn empty_pop_reports_the_stream_that_was_empty() {
        let mut fac = host_mixer([HostBuf::open(), HostBuf::phantom(5.0), HostBuf::open()]);
        fac.input_mut(Stream::Filler).push(depleted_u(10.0)).unwrap();

        let outcome = fac.tick().unwrap();
        assert_eq!(outcome, MixOutcome::Idle(StallReason::MissingFissile));
        assert_eq!(fac.input(Stream::Filler).quantity(), fixed(10.0));
        assert_eq!(
            fac.state(),
            MixerState::Stalled {
                reason: StallReason::MissingFissile
            }
        );
    }
}
