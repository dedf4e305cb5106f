use crate::driver::Presenter;
use crate::simulation::FrameView;
use anyhow::{Context, Result};
use log::{info, warn};
use particle_life_common::Snapshot;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// On-disk encoding of recorded snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    /// A `u32` snapshot count followed by each snapshot, so readers can stream frames.
    Bincode,
    MessagePack,
}

impl OutputFormat {
    /// Maps the config string onto a format, falling back to JSON for unknown names.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(|n| n.to_ascii_lowercase()) {
            None => OutputFormat::Json,
            Some(n) => match n.as_str() {
                "json" => OutputFormat::Json,
                "bincode" | "bin" => OutputFormat::Bincode,
                "messagepack" | "msgpack" => OutputFormat::MessagePack,
                other => {
                    warn!("Unknown output format: {}. Using JSON instead.", other);
                    OutputFormat::Json
                }
            },
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::MessagePack => "msgpack",
        }
    }

    /// `<base>_snapshots.<ext>`
    pub fn snapshot_path(&self, base_filename: &str) -> PathBuf {
        PathBuf::from(format!("{}_snapshots.{}", base_filename, self.extension()))
    }
}

/// Presenter that keeps a snapshot of every `interval`-th frame.
#[derive(Debug)]
pub struct SnapshotRecorder {
    interval: u64,
    include_particles: bool,
    snapshots: Vec<Snapshot>,
}

impl SnapshotRecorder {
    pub fn new(interval: u32, include_particles: bool) -> Self {
        Self { interval: interval.max(1) as u64, include_particles, snapshots: Vec::new() }
    }

    /// Records `frame` regardless of the interval.
    pub fn record(&mut self, frame: &FrameView<'_>) {
        self.snapshots.push(frame.to_snapshot(self.include_particles));
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }
}

impl Presenter for SnapshotRecorder {
    fn present(&mut self, frame: &FrameView<'_>) -> Result<()> {
        if frame.frame % self.interval == 0 {
            self.record(frame);
        }
        Ok(())
    }
}

/// Writes `snapshots` to `path` in `format`.
pub fn write_snapshots(path: &Path, format: OutputFormat, snapshots: &[Snapshot]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Error creating snapshot file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut writer, snapshots)
                .context("Error serializing snapshots to JSON")?;
        }
        OutputFormat::Bincode => {
            bincode::serialize_into(&mut writer, &(snapshots.len() as u32))
                .context("Error writing snapshot count header")?;
            for snapshot in snapshots {
                bincode::serialize_into(&mut writer, snapshot)
                    .context("Error serializing snapshot to bincode")?;
            }
        }
        OutputFormat::MessagePack => {
            rmp_serde::encode::write(&mut writer, snapshots)
                .context("Error serializing snapshots to MessagePack")?;
        }
    }

    writer.flush().with_context(|| format!("Error flushing '{}'", path.display()))?;
    info!("{} snapshots saved to {} ({:?} format)", snapshots.len(), path.display(), format);
    Ok(())
}

/// Writes the particles of `frame` as `x,y,species` CSV rows.
pub fn write_final_positions(path: &Path, frame: &FrameView<'_>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Error creating CSV file '{}'", path.display()))?;
    writer.write_record(["x", "y", "species"])?;
    for idx in 0..frame.particle_count {
        writer.write_record(&[
            format!("{:.6}", frame.pos_x[idx]),
            format!("{:.6}", frame.pos_y[idx]),
            frame.species[idx].to_string(),
        ])?;
    }
    writer.flush()?;
    info!("Final positions saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Simulation;
    use particle_life_common::SimulationConfig;
    use std::io::BufReader;

    fn sim_with_frames(frames: usize) -> Simulation {
        let mut config = SimulationConfig::default();
        config.particles.count = 64;
        let mut sim = Simulation::new(&config, 21, 0).unwrap();
        for _ in 0..frames {
            sim.step();
        }
        sim
    }

    #[test]
    fn format_names() {
        assert_eq!(OutputFormat::from_name(None), OutputFormat::Json);
        assert_eq!(OutputFormat::from_name(Some("BINCODE")), OutputFormat::Bincode);
        assert_eq!(OutputFormat::from_name(Some("msgpack")), OutputFormat::MessagePack);
        assert_eq!(OutputFormat::from_name(Some("yaml")), OutputFormat::Json);
        assert_eq!(
            OutputFormat::Bincode.snapshot_path("run"),
            PathBuf::from("run_snapshots.bin")
        );
    }

    #[test]
    fn recorder_respects_interval() {
        let mut sim = sim_with_frames(0);
        let mut recorder = SnapshotRecorder::new(3, false);
        recorder.record(&sim.frame());
        for _ in 0..7 {
            sim.step();
            recorder.present(&sim.frame()).unwrap();
        }
        let frames: Vec<u64> = recorder.snapshots().iter().map(|s| s.frame).collect();
        assert_eq!(frames, vec![0, 3, 6]);
    }

    #[test]
    fn writes_each_format() {
        let sim = sim_with_frames(2);
        let snapshots = vec![sim.record_snapshot(true), sim.record_snapshot(false)];
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("s.json");
        write_snapshots(&json_path, OutputFormat::Json, &snapshots).unwrap();
        let parsed: Vec<Snapshot> =
            serde_json::from_reader(BufReader::new(File::open(&json_path).unwrap())).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].positions.as_ref().map(Vec::len), Some(64));

        let bin_path = dir.path().join("s.bin");
        write_snapshots(&bin_path, OutputFormat::Bincode, &snapshots).unwrap();
        let mut reader = BufReader::new(File::open(&bin_path).unwrap());
        let count: u32 = bincode::deserialize_from(&mut reader).unwrap();
        assert_eq!(count, 2);
        let first: Snapshot = bincode::deserialize_from(&mut reader).unwrap();
        assert_eq!(first.species, snapshots[0].species);
        let second: Snapshot = bincode::deserialize_from(&mut reader).unwrap();
        assert!(second.positions.is_none());

        let mp_path = dir.path().join("s.msgpack");
        write_snapshots(&mp_path, OutputFormat::MessagePack, &snapshots).unwrap();
        let parsed: Vec<Snapshot> = rmp_serde::from_read(File::open(&mp_path).unwrap()).unwrap();
        assert_eq!(parsed[1].frame, 2);
    }

    #[test]
    fn csv_has_header_and_one_row_per_particle() {
        let sim = sim_with_frames(1);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final.csv");
        write_final_positions(&path, &sim.frame()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(header, vec!["x", "y", "species"]);
        assert_eq!(reader.records().count(), 64);
    }
}
