use serde::{Serialize, Deserialize};

/// A snapshot of the simulation state at a specific frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Frame number within the generation that produced it.
    pub frame: u64,
    /// Simulation time (frame * dt).
    pub time: f32,
    /// Seed the recorded simulation was built from.
    pub seed: u32,
    /// Reseed generation the recorded simulation belongs to.
    pub generation: u64,
    pub particle_count: u32,
    /// Number of species, needed to map species ids onto hues.
    pub species_count: u32,
    /// Mean magnitude of the per-particle velocity change over the recorded frame.
    pub mean_acceleration: f32,
    // Per-particle data, only present when `output.save_positions_in_snapshot` is set.
    // Kept without `skip_serializing_if` so non-self-describing formats (bincode) round-trip.
    pub positions: Option<Vec<(f32, f32)>>,
    pub species: Option<Vec<u32>>,
    pub accelerations: Option<Vec<(f32, f32)>>,
}
