//! Blend planning: how much of each input stream to mix this tick.
//!
//! Planning is split in two. [`plan_blend`] is pure arithmetic over the
//! stream quantities, the solver's fissile fraction and the capacity limits.
//! [`mix`] applies a finished [`BlendPlan`] to two batches by extracting the
//! planned masses and absorbing them into one output batch.

use crate::fixed::{checked_div_64, Fixed64};
use crate::material::{Resource, ResourceError};

// ---------------------------------------------------------------------------
// Streams and stall reasons
// ---------------------------------------------------------------------------

/// One of the two input streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Stream {
    /// Input 1, the diluent stream.
    Filler,
    /// Input 2, the reactivity-bearing stream.
    Fissile,
}

/// Why the mixer did not blend this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StallReason {
    MissingFiller,
    MissingFissile,
    NoThroughput,
    OutputFull,
    /// The fissile stream cannot reach the target at any ratio.
    InfeasibleBlend,
}

// ---------------------------------------------------------------------------
// Limits and plan
// ---------------------------------------------------------------------------

/// Capacity limits for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendLimits {
    /// Maximum mass processed per tick.
    pub throughput: Fixed64,
    /// Remaining room in the output buffer.
    pub output_space: Fixed64,
    /// Quantities below this count as empty.
    pub epsilon: Fixed64,
}

impl BlendLimits {
    /// The most the output side can take this tick.
    pub fn capacity(&self) -> Fixed64 {
        self.throughput.min(self.output_space)
    }
}

/// The arithmetic result of planning one blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendPlan {
    /// Mass of the blended output. Always `source1_consumed + source2_consumed`.
    pub blend_quantity: Fixed64,
    /// Fraction of the blend taken from the filler stream.
    pub frac1: Fixed64,
    /// Fraction of the blend taken from the fissile stream. `frac1 + frac2 == 1`.
    pub frac2: Fixed64,
    pub source1_consumed: Fixed64,
    pub source2_consumed: Fixed64,
    /// `min(throughput, output_space)` before any input constraint.
    pub requested: Fixed64,
    /// The input stream that limited the blend, if any.
    pub binding: Option<Stream>,
}

/// Outcome of planning one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendDecision {
    Idle(StallReason),
    /// The solver returned a negative fraction.
    Infeasible { fissile_frac: Fixed64 },
    Blend(BlendPlan),
}

impl BlendDecision {
    /// Planned blend mass; zero for idle and infeasible ticks.
    pub fn blend_quantity(&self) -> Fixed64 {
        match self {
            BlendDecision::Blend(plan) => plan.blend_quantity,
            _ => Fixed64::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Check whether a tick can blend at all. Returns the stall reason if not.
///
/// Quantities within `epsilon` of zero count as empty here only; the
/// arithmetic in [`plan_blend`] uses the exact values.
pub fn check_ready(
    filler_qty: Fixed64,
    fissile_qty: Fixed64,
    limits: &BlendLimits,
) -> Option<StallReason> {
    let eps = limits.epsilon;
    if filler_qty < eps {
        Some(StallReason::MissingFiller)
    } else if fissile_qty < eps {
        Some(StallReason::MissingFissile)
    } else if limits.throughput < eps {
        Some(StallReason::NoThroughput)
    } else if limits.capacity() < eps {
        Some(StallReason::OutputFull)
    } else {
        None
    }
}

/// Plan a blend of `filler_qty` and `fissile_qty` where the solver asked for
/// `fissile_frac` of the blend mass to come from the fissile stream.
///
/// The blend starts at `min(throughput, output_space)`. If either stream
/// cannot cover its share, the stream with the smaller slack
/// (`available - share`) binds and the blend shrinks to what that stream
/// supports. Equal slacks bind the fissile stream. A stream with a zero
/// share never binds. The binding stream is consumed whole.
pub fn plan_blend(
    filler_qty: Fixed64,
    fissile_qty: Fixed64,
    fissile_frac: Fixed64,
    limits: &BlendLimits,
) -> BlendDecision {
    if let Some(reason) = check_ready(filler_qty, fissile_qty, limits) {
        return BlendDecision::Idle(reason);
    }
    if fissile_frac < Fixed64::ZERO {
        return BlendDecision::Infeasible { fissile_frac };
    }

    let frac2 = fissile_frac.min(Fixed64::ONE);
    let frac1 = Fixed64::ONE - frac2;
    let requested = limits.capacity();

    let slack1 = slack(filler_qty, frac1, requested);
    let slack2 = slack(fissile_qty, frac2, requested);

    let binding = if slack1 >= Fixed64::ZERO && slack2 >= Fixed64::ZERO {
        None
    } else if slack1 < slack2 {
        Some(Stream::Filler)
    } else {
        Some(Stream::Fissile)
    };

    let streams = [(filler_qty, frac1), (fissile_qty, frac2)];
    let (qty, binding) = match binding {
        None => (requested, None),
        Some(stream) => {
            let qty = supported_qty(streams[index(stream)], requested);
            // The slack ordering can pick a stream that is not actually the
            // tighter one when the fractions differ; fall through to the other.
            let other = other_stream(stream);
            let (other_avail, other_frac) = streams[index(other)];
            if other_frac.saturating_mul(qty) - other_avail > limits.epsilon {
                (supported_qty(streams[index(other)], requested), Some(other))
            } else {
                (qty, Some(stream))
            }
        }
    };

    let take = |stream: Stream| -> Fixed64 {
        let (avail, frac) = streams[index(stream)];
        if binding == Some(stream) {
            avail
        } else {
            frac.saturating_mul(qty).min(avail)
        }
    };
    let source1_consumed = take(Stream::Filler);
    let source2_consumed = take(Stream::Fissile);

    BlendDecision::Blend(BlendPlan {
        blend_quantity: source1_consumed + source2_consumed,
        frac1,
        frac2,
        source1_consumed,
        source2_consumed,
        requested,
        binding,
    })
}

/// Available mass left after covering this stream's share of `qty`. A
/// stream with a zero share has unlimited slack.
fn slack(available: Fixed64, frac: Fixed64, qty: Fixed64) -> Fixed64 {
    if frac == Fixed64::ZERO {
        Fixed64::MAX
    } else {
        available - frac.saturating_mul(qty)
    }
}

/// Largest blend a stream can support at its fraction, capped at `requested`.
fn supported_qty((available, frac): (Fixed64, Fixed64), requested: Fixed64) -> Fixed64 {
    checked_div_64(available, frac).map_or(requested, |q| q.min(requested))
}

fn index(stream: Stream) -> usize {
    match stream {
        Stream::Filler => 0,
        Stream::Fissile => 1,
    }
}

fn other_stream(stream: Stream) -> Stream {
    match stream {
        Stream::Filler => Stream::Fissile,
        Stream::Fissile => Stream::Filler,
    }
}

// ---------------------------------------------------------------------------
// Applying a plan
// ---------------------------------------------------------------------------

/// Extract the planned masses from both batches and combine them into the
/// blended output. The batches keep their remainders.
pub fn mix<R: Resource>(
    filler: &mut R,
    fissile: &mut R,
    plan: &BlendPlan,
) -> Result<R, ResourceError> {
    let mut blend = filler.extract_qty(plan.source1_consumed)?;
    blend.absorb(fissile.extract_qty(plan.source2_consumed)?);
    Ok(blend)
}
