use anyhow::Result;
use clap::Parser;
use log::{debug, info, trace};
use particle_life::{
    write_final_positions, write_snapshots, FrameDriver, FrameOutcome, OutputFormat, Presenter,
    ReseedControl, SimulationConfig, SnapshotRecorder,
};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Headless particle-life runner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration (defaults are used if omitted and ./config.toml is absent)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed override; a random seed is drawn when neither this nor the config sets one
    #[arg(short, long)]
    seed: Option<u32>,

    /// Number of frames to run (overrides timing.total_frames)
    #[arg(short, long)]
    frames: Option<u32>,

    /// Snapshot format: json, bincode or messagepack (overrides output.format)
    #[arg(long)]
    format: Option<String>,

    /// Request a fresh random seed every N frames (overrides engine.reseed_every_frames)
    #[arg(long)]
    reseed_every: Option<u32>,
}

fn load_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None if Path::new("config.toml").exists() => SimulationConfig::load("config.toml")?,
        None => {
            info!("No configuration file given; using built-in defaults.");
            SimulationConfig::default()
        }
    };

    if let Some(seed) = args.seed {
        config.particles.seed = Some(seed);
    }
    if let Some(frames) = args.frames {
        config.timing.total_frames = frames;
    }
    if args.format.is_some() {
        config.output.format = args.format.clone();
    }
    if args.reseed_every.is_some() {
        config.engine.reseed_every_frames = args.reseed_every;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting particle-life engine...");
    let args = Args::parse();
    let config = load_config(&args)?;

    if config.engine.parallel_forces {
        info!("Using {} Rayon threads for the force pass.", rayon::current_num_threads());
    }

    let seed = config.particles.seed.unwrap_or_else(rand::random::<u32>);
    info!("Initial seed: {}", seed);

    let control = ReseedControl::new(seed);
    let mut driver = FrameDriver::new(config.clone(), control.clone())?;
    debug!("Simulation Parameters: {:#?}", driver.simulation().params());

    let total_frames = config.timing.total_frames;
    let mut recorder = SnapshotRecorder::new(
        config.timing.record_interval_frames,
        config.output.save_positions_in_snapshot,
    );
    recorder.record(&driver.simulation().frame());

    info!("Starting simulation loop for {} frames...", total_frames);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;
    let print_interval_secs = 5.0;

    for frame in 1..=total_frames {
        let step_start_time = Instant::now();
        let outcome = driver.advance(Some(&mut recorder as &mut dyn Presenter))?;
        let step_duration = step_start_time.elapsed();

        if let FrameOutcome::Reseeded { generation, seed, .. } = outcome {
            info!("Frame {}: now running generation {} (seed {}).", frame, generation, seed);
            recorder.record(&driver.simulation().frame());
        }

        if let Some(every) = config.engine.reseed_every_frames {
            if frame % every == 0 && frame < total_frames {
                let next_seed = rand::random::<u32>();
                let generation = control.request(next_seed);
                debug!("Requested generation {} with seed {}.", generation, next_seed);
            }
        }

        let now = Instant::now();
        if now.duration_since(previous_print_time).as_secs_f64() >= print_interval_secs || frame == total_frames {
            let sim = driver.simulation();
            info!(
                "Frame [{}/{}] | Generation {} | Pairs: {} | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                frame,
                total_frames,
                sim.generation(),
                sim.last_report().interacting_pairs,
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = now;
        } else {
            trace!("Frame [{}/{}] completed in {:.2} ms", frame, total_frames, step_duration.as_secs_f64() * 1000.0);
        }
    }

    info!("Simulation finished in {:.3} seconds.", start_time.elapsed().as_secs_f64());
    if driver.simulation().total_stale_removals() > 0 {
        info!(
            "Spatial index recovered from {} stale removals in the final generation.",
            driver.simulation().total_stale_removals()
        );
    }

    // --- Save Recorded Data ---
    if config.output.save_snapshots {
        let format = OutputFormat::from_name(config.output.format.as_deref());
        let path = format.snapshot_path(&config.output.base_filename);
        write_snapshots(&path, format, recorder.snapshots())?;
    } else {
        info!("Skipping saving snapshots as per config (save_snapshots is false).");
    }

    if config.output.save_final_positions {
        let path = PathBuf::from(format!("{}_final_positions.csv", config.output.base_filename));
        write_final_positions(&path, &driver.simulation().frame())?;
    } else {
        info!("Skipping saving final positions as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}
