//! Run a MOX mixer from a data directory.
//!
//! Loads `recipes.*` and `mixer.*`, feeds the two input buffers each tick
//! from unlimited supplies of their recipes, drains the output buffer every
//! third tick, and prints a summary of the campaign.
//!
//! Run with: `cargo run -p fuelmix-data --example run_mixer [data_dir]`
//! Set `RUST_LOG=debug` to see per-tick buffer levels.

use std::path::PathBuf;

use fuelmix_core::buffer::ResourceBuffer;
use fuelmix_core::event::EventKind;
use fuelmix_core::facility::MixOutcome;
use fuelmix_core::fixed::{fixed64_to_f64, Fixed64};
use fuelmix_core::id::Nuclide;
use fuelmix_core::material::{Composition, Material};
use fuelmix_core::planner::Stream;
use fuelmix_data::load_mixer_data;
use tracing_subscriber::{fmt, EnvFilter};

/// Solve for the fissile fraction by balancing Pu-239 between the streams.
fn pu239_balance(target: &Composition, filler: &Composition, fissile: &Composition) -> Fixed64 {
    let t = target.mass_frac(Nuclide::PU239);
    let a = filler.mass_frac(Nuclide::PU239);
    let b = fissile.mass_frac(Nuclide::PU239);
    if b <= t || b <= a {
        return -Fixed64::ONE;
    }
    (t - a) / (b - a)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/mox"));
    let setup = load_mixer_data(&dir)?;
    let mut mixer = setup.build_mixer(pu239_balance)?;

    let settings = mixer.settings().clone();
    let feed = |id| -> Result<Composition, Box<dyn std::error::Error>> {
        Ok(setup
            .registry
            .composition(id)
            .ok_or("input recipe missing from registry")?
            .clone())
    };
    let tails = feed(settings.in_recipe1)?;
    let pu = feed(settings.in_recipe2)?;

    let mut shipped = Fixed64::ZERO;
    for tick in 0..12u64 {
        let demands = mixer.input_demands().map(|d| (d.stream, d.quantity));
        for (stream, space) in demands {
            let batch = space.min(Fixed64::from_num(50));
            if batch <= Fixed64::ZERO {
                continue;
            }
            let composition = match stream {
                Stream::Filler => tails.clone(),
                Stream::Fissile => pu.clone(),
            };
            mixer.input_mut(stream).push(Material::new(batch, composition)?)?;
        }

        match mixer.tick()? {
            MixOutcome::Mixed(report) => println!(
                "tick {tick:>2}: mixed {:>8.3} kg, Pu-239 {:.4}",
                fixed64_to_f64(report.plan.blend_quantity),
                fixed64_to_f64(report.mass_frac(Nuclide::PU239)),
            ),
            MixOutcome::Idle(reason) => println!("tick {tick:>2}: idle ({reason:?})"),
            MixOutcome::Infeasible { fissile_frac } => {
                println!("tick {tick:>2}: infeasible (fissile fraction {fissile_frac})")
            }
        }

        if tick % 3 == 2 {
            let offer = mixer.output_offer();
            shipped += offer.quantity;
            println!(
                "         shipped {:.3} kg of {}",
                fixed64_to_f64(offer.quantity),
                offer.commodity
            );
            mixer.output_mut().pop_all();
        }
    }

    let events = mixer.events();
    println!("\n--- Summary ---");
    println!("shipped: {:.3} kg", fixed64_to_f64(shipped));
    println!("mixed ticks: {}", events.buffered_count(EventKind::Mixed));
    println!("constrained ticks: {}", events.buffered_count(EventKind::Constrained));
    println!("stalls: {}", events.buffered_count(EventKind::Stalled));
    println!("final state: {:?}", mixer.state());

    Ok(())
}
