use std::env;

use log::{info, warn};
use particle_field::{AppSettings, Simulation};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = AppSettings::load()?;

    let seed = match env::args().nth(1) {
        Some(arg) => match arg.parse::<u64>() {
            Ok(seed) => Some(seed),
            Err(_) => {
                warn!("seed must be an unsigned integer, got {arg:?}; falling back to a time-based seed");
                None
            }
        },
        None => settings.seed,
    };

    let mut simulation = Simulation::with_settings(settings.physics.clone());
    simulation.init(settings.particle_count, seed)?;
    println!("Seed used: {}", simulation.get_seed());

    for frame in 1..=settings.frames {
        simulation.advance_frame()?;
        if settings.report_every > 0 && frame % settings.report_every == 0 {
            let physics = simulation.physics()?;
            info!(
                "frame {}: mean speed {:.5}, particles per color {:?}",
                frame,
                physics.mean_speed(),
                physics.type_count()
            );
        }
    }

    let positions = simulation.get_positions()?;
    info!(
        "finished {} frames with {} particles",
        settings.frames,
        positions.x.len()
    );
    println!("Replay with seed {}", simulation.get_seed());
    Ok(())
}
