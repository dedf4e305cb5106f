use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};
use palette::{FromColor, Hsl, Srgb};
use particle_life_common::{clamp, Snapshot};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input snapshot file path (.bin or .json)
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the PNG frames are written to
    #[arg(short, long, default_value = "frames")]
    output_dir: PathBuf,

    /// Width of the output frames in pixels
    #[arg(long, default_value_t = 1024)]
    width: u32,

    /// Height of the output frames in pixels (square if not provided)
    #[arg(long)]
    height: Option<u32>,

    /// Particle radius in pixels
    #[arg(long, default_value_t = 1.25)]
    radius: f32,

    /// Chunk size for parallel processing
    #[arg(long, default_value_t = 10)]
    chunk_size: usize,
}

/// Acceleration at which lightness saturates.
const ACCEL_WINDOW: f32 = 0.013;

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Lightness in percent from a particle's acceleration: 25 when strongly
/// decelerating, 100 when strongly accelerating.
fn lightness(acc_x: f32, acc_y: f32) -> f32 {
    let w = ACCEL_WINDOW;
    let acc = clamp(acc_y.max(acc_x), -w, w);
    (75.0 / (w * 2.0)) * (acc - w) + 100.0
}

/// Species hue spread evenly round the colour wheel, fully saturated.
fn species_color(species: u32, species_count: u32, lightness_percent: f32) -> Rgba<u8> {
    let hue = 360.0 / species_count.max(1) as f32 * species as f32;
    let hsl: Hsl = Hsl::new(hue, 1.0, lightness_percent / 100.0);
    let rgb: Srgb = Srgb::from_color(hsl);
    let rgb: Srgb<u8> = rgb.into_format();
    Rgba([rgb.red, rgb.green, rgb.blue, 255])
}

/// Draws one snapshot. Returns `None` when it carries no per-particle data.
fn draw_frame(snapshot: &Snapshot, width: u32, height: u32, radius: f32) -> Option<RgbaImage> {
    let positions = snapshot.positions.as_ref()?;
    let species = snapshot.species.as_ref()?;
    let accelerations = snapshot.accelerations.as_ref();

    let mut image = ImageBuffer::from_pixel(width, height, BACKGROUND);
    let radius_px = radius.round().max(1.0) as i32;

    for (i, (&(x, y), &s)) in positions.iter().zip(species.iter()).enumerate() {
        let (ax, ay) = accelerations.and_then(|a| a.get(i)).copied().unwrap_or((0.0, 0.0));
        let color = species_color(s, snapshot.species_count, lightness(ax, ay));
        let px = (x * width as f32) as i32;
        let py = (y * height as f32) as i32;
        draw_filled_circle_mut(&mut image, (px, py), radius_px, color);
    }

    Some(image)
}

/// Reads snapshots written by the engine (bincode stream with count header, or JSON array).
fn read_snapshots(path: &Path) -> Result<Vec<Snapshot>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;
    let mut reader = BufReader::new(file);

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse JSON snapshots from {}", path.display())),
        Some("bin") => {
            let count: u32 = bincode::deserialize_from(&mut reader)
                .context("Failed to read snapshot count from header")?;
            (0..count)
                .map(|i| {
                    bincode::deserialize_from(&mut reader)
                        .with_context(|| format!("Failed to read snapshot {} of {}", i, count))
                })
                .collect()
        }
        other => anyhow::bail!("Unsupported snapshot file extension: {:?} (expected .bin or .json)", other),
    }
}

/// Renders a chunk of snapshots and writes them as `frame_NNNNN.png`. Returns frames written.
fn process_snapshot_chunk(
    chunk: &[(usize, &Snapshot)],
    output_dir: &Path,
    width: u32,
    height: u32,
    radius: f32,
) -> Result<usize> {
    let mut written = 0;
    for &(index, snapshot) in chunk {
        let Some(image) = draw_frame(snapshot, width, height, radius) else {
            warn!("Snapshot {} (frame {}) has no positions; skipping.", index, snapshot.frame);
            continue;
        };
        let path = output_dir.join(format!("frame_{:05}.png", index));
        image
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += 1;
    }
    Ok(written)
}

fn main() -> Result<()> {
    let args = Args::parse();
    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    // try_init so tests can call this more than once
    let _ = Builder::from_default_env().filter(None, LevelFilter::Info).try_init();

    info!("Starting Particle Life Visualizer...");
    info!("Input file: {}", args.input.display());
    info!("Output directory: {}", args.output_dir.display());

    let width = args.width;
    let height = args.height.unwrap_or(width);
    info!("Frame dimensions: {}x{}", width, height);

    let snapshots = read_snapshots(&args.input)?;
    info!("Loaded {} snapshots.", snapshots.len());

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let indexed: Vec<(usize, &Snapshot)> = snapshots.iter().enumerate().collect();
    let chunk_size = args.chunk_size.max(1);
    let chunk_count = indexed.len().div_ceil(chunk_size) as u64;

    let progress = ProgressBar::new(chunk_count);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} chunks")
            .context("Invalid progress bar template")?,
    );

    let start = Instant::now();
    let written: usize = indexed
        .par_chunks(chunk_size)
        .progress_with(progress)
        .map(|chunk| process_snapshot_chunk(chunk, &args.output_dir, width, height, args.radius))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .sum();

    info!(
        "Wrote {} frames to {} in {:.2} s.",
        written,
        args.output_dir.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

// Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(positions: Vec<(f32, f32)>, species: Vec<u32>, species_count: u32) -> Snapshot {
        let n = positions.len();
        Snapshot {
            frame: 0,
            time: 0.0,
            seed: 1,
            generation: 0,
            particle_count: n as u32,
            species_count,
            mean_acceleration: 0.0,
            positions: Some(positions),
            species: Some(species),
            accelerations: Some(vec![(0.0, 0.0); n]),
        }
    }

    #[test]
    fn lightness_spans_25_to_100() {
        assert!((lightness(1.0, 0.0) - 100.0).abs() < 1e-3);
        assert!((lightness(-1.0, -1.0) - 25.0).abs() < 1e-3);
        assert!((lightness(0.0, 0.0) - 62.5).abs() < 1e-3);
        // the larger component wins
        assert_eq!(lightness(-1.0, 1.0), lightness(1.0, -1.0));
    }

    #[test]
    fn species_hues_differ() {
        let a = species_color(0, 3, 50.0);
        let b = species_color(1, 3, 50.0);
        assert_ne!(a, b);
        // hue 0 at half lightness is pure red
        assert_eq!(a, Rgba([255, 0, 0, 255]));
        assert_eq!(species_color(0, 3, 100.0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn draws_particles_over_black() {
        let snap = snapshot(vec![(0.5, 0.5)], vec![0], 2);
        let image = draw_frame(&snap, 64, 64, 2.0).expect("has positions");
        assert_ne!(*image.get_pixel(32, 32), BACKGROUND);
        assert_eq!(*image.get_pixel(2, 2), BACKGROUND);
    }

    #[test]
    fn summary_snapshots_are_skipped() {
        let mut snap = snapshot(vec![], vec![], 2);
        snap.positions = None;
        assert!(draw_frame(&snap, 8, 8, 1.0).is_none());
    }

    #[test]
    fn renders_frames_from_bincode_stream() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("run_snapshots.bin");
        let snapshots = vec![
            snapshot(vec![(0.1, 0.1), (0.9, 0.9)], vec![0, 1], 2),
            snapshot(vec![(0.2, 0.3)], vec![1], 2),
        ];
        {
            let mut file = File::create(&input).unwrap();
            bincode::serialize_into(&mut file, &(snapshots.len() as u32)).unwrap();
            for s in &snapshots {
                bincode::serialize_into(&mut file, s).unwrap();
            }
        }

        let output_dir = dir.path().join("frames");
        run_with_args(Args {
            input,
            output_dir: output_dir.clone(),
            width: 32,
            height: None,
            radius: 1.0,
            chunk_size: 1,
        })
        .unwrap();

        assert!(output_dir.join("frame_00000.png").exists());
        assert!(output_dir.join("frame_00001.png").exists());
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.yaml");
        File::create(&path).unwrap();
        assert!(read_snapshots(&path).is_err());
    }
}
