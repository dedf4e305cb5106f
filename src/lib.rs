pub mod driver;
pub mod force;
pub mod grid;
pub mod integrator;
pub mod interaction;
pub mod output;
pub mod particle_state;
pub mod rng;
pub mod simulation;

pub use driver::{FrameDriver, FrameOutcome, Presenter, ReseedControl};
pub use force::{force, DEFAULT_BETA};
pub use grid::SpatialIndex;
pub use integrator::{net_force, Integrator, StepReport};
pub use interaction::{species_count, InteractionMatrix};
pub use output::{write_final_positions, write_snapshots, OutputFormat, SnapshotRecorder};
pub use particle_state::ParticleState;
pub use rng::SplitMix32;
pub use simulation::{FrameView, Simulation};

pub use particle_life_common::{SimParams, SimulationConfig, Snapshot, Vec2};
