pub mod config;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, ParticlesConfig, TimingConfig, ForcesConfig, EngineConfig, OutputConfig, MAX_INTERACTION_RADIUS};
pub use sim_params::SimParams;
pub use snapshot::Snapshot;
pub use vecmath::{Vec2, wrap_unit, min_image, clamp};
