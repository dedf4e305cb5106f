use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::SimParams;
use std::path::Path;

/// Largest interaction radius for which a 3x3 cell neighbourhood still covers
/// the whole interaction disc on the unit torus.
pub const MAX_INTERACTION_RADIUS: f32 = 0.5;

// Particle population settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ParticlesConfig {
    #[serde(default = "default_particle_count")]
    pub count: u32,
    /// Seed for the deterministic generator. `None` means "pick one at start-up".
    #[serde(default)]
    pub seed: Option<u32>,
}

// Configuration for timing
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_dt")]
    pub dt: f32,
    /// Seconds for velocity to halve with no force applied.
    #[serde(default = "default_friction_half_life")]
    pub friction_half_life: f32,
    #[serde(default = "default_total_frames")]
    pub total_frames: u32,
    #[serde(default = "default_record_interval_frames")]
    pub record_interval_frames: u32,
}

// Force law settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ForcesConfig {
    /// Interaction radius on the unit torus.
    #[serde(default = "default_r_max")]
    pub r_max: f32,
    #[serde(default = "default_force_factor")]
    pub force_factor: f32,
    /// Normalised distance where short-range repulsion hands over to the species bump.
    #[serde(default = "default_beta")]
    pub beta: f32,
}

// Execution settings for the engine and the headless runner
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_parallel_forces")]
    pub parallel_forces: bool,
    /// Request a fresh seed every N frames (runner only).
    #[serde(default)]
    pub reseed_every_frames: Option<u32>,
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
    #[serde(default = "default_true")]
    pub save_snapshots: bool,
    #[serde(default = "default_true")]
    pub save_final_positions: bool,
    #[serde(default = "default_true")]
    pub save_positions_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SimulationConfig {
    #[serde(default)]
    pub particles: ParticlesConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub forces: ForcesConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for ParticlesConfig {
    fn default() -> Self {
        ParticlesConfig { count: default_particle_count(), seed: None }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            dt: default_dt(),
            friction_half_life: default_friction_half_life(),
            total_frames: default_total_frames(),
            record_interval_frames: default_record_interval_frames(),
        }
    }
}

impl Default for ForcesConfig {
    fn default() -> Self {
        ForcesConfig {
            r_max: default_r_max(),
            force_factor: default_force_factor(),
            beta: default_beta(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { parallel_forces: default_parallel_forces(), reseed_every_frames: None }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: default_base_filename(),
            save_snapshots: true,
            save_final_positions: true,
            save_positions_in_snapshot: true,
            format: None,
        }
    }
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file and validates it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;

        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(text)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.particles.count == 0 {
            anyhow::bail!("particles.count must be greater than 0.");
        }
        if !(self.timing.dt.is_finite() && self.timing.dt > 0.0) {
            anyhow::bail!("timing.dt must be a positive number (got {}).", self.timing.dt);
        }
        if !(self.timing.friction_half_life.is_finite() && self.timing.friction_half_life > 0.0) {
            anyhow::bail!(
                "timing.friction_half_life must be a positive number (got {}).",
                self.timing.friction_half_life
            );
        }
        if self.timing.record_interval_frames == 0 {
            anyhow::bail!("timing.record_interval_frames must be at least 1.");
        }
        let r_max = self.forces.r_max;
        if !(r_max.is_finite() && r_max > 0.0 && r_max <= MAX_INTERACTION_RADIUS) {
            anyhow::bail!(
                "forces.r_max must lie in (0, {}] so a 3x3 cell neighbourhood covers the interaction radius (got {}).",
                MAX_INTERACTION_RADIUS,
                r_max
            );
        }
        let grid_dim = grid_dim_for(r_max);
        if grid_dim.checked_mul(grid_dim).is_none() {
            anyhow::bail!(
                "forces.r_max {} is too small: its {}x{} grid has more cells than fit in a u32 (use r_max >= {:e}).",
                r_max,
                grid_dim,
                grid_dim,
                1.0 / (u16::MAX as f32)
            );
        }
        if !self.forces.force_factor.is_finite() {
            anyhow::bail!("forces.force_factor must be finite.");
        }
        if !(self.forces.beta > 0.0 && self.forces.beta < 1.0) {
            anyhow::bail!("forces.beta must lie strictly between 0 and 1 (got {}).", self.forces.beta);
        }
        if self.engine.reseed_every_frames == Some(0) {
            anyhow::bail!("engine.reseed_every_frames must be at least 1 when set.");
        }
        Ok(())
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        let dt = self.timing.dt;
        let r_max = self.forces.r_max;

        // Velocity damping per step
        let friction_factor = 0.5f32.powf(dt / self.timing.friction_half_life);

        let grid_dim = grid_dim_for(r_max);
        let grid_cell_size = 1.0 / grid_dim as f32;

        SimParams {
            particle_count: self.particles.count,
            dt,
            friction_factor,
            r_max,
            force_scale: r_max * self.forces.force_factor,
            beta: self.forces.beta,
            grid_dim,
            grid_cell_size,
            // validate() rejects grids whose cell count overflows
            num_grid_cells: grid_dim.saturating_mul(grid_dim),
        }
    }
}

// Absorbs f32 representation error so r_max = 0.1 yields 10 cells, not 9.
const GRID_DIM_TOLERANCE: f64 = 1e-4;

/// The largest cell count per axis whose cells are still at least `r_max` wide.
fn grid_dim_for(r_max: f32) -> u32 {
    (((1.0 / r_max as f64) + GRID_DIM_TOLERANCE).floor() as u32).max(1)
}

fn default_particle_count() -> u32 {
    1200
}

fn default_dt() -> f32 {
    0.02
}

fn default_friction_half_life() -> f32 {
    0.04
}

fn default_total_frames() -> u32 {
    600
}

fn default_record_interval_frames() -> u32 {
    10
}

fn default_r_max() -> f32 {
    0.1
}

fn default_force_factor() -> f32 {
    2.0
}

fn default_beta() -> f32 {
    0.3
}

fn default_parallel_forces() -> bool {
    true
}

fn default_base_filename() -> String {
    "particle_life".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_program() {
        let config = SimulationConfig::default();
        assert_eq!(config.particles.count, 1200);
        assert_eq!(config.timing.dt, 0.02);
        assert_eq!(config.timing.friction_half_life, 0.04);
        assert_eq!(config.forces.r_max, 0.1);
        assert_eq!(config.forces.force_factor, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [particles]
            count = 50
            seed = 7

            [forces]
            r_max = 0.2
            "#,
        )
        .expect("valid config");
        assert_eq!(config.particles.count, 50);
        assert_eq!(config.particles.seed, Some(7));
        assert_eq!(config.forces.r_max, 0.2);
        assert_eq!(config.timing.dt, 0.02);
        assert!(config.engine.parallel_forces);
    }

    fn assert_rejected(field: &str, mutate: impl FnOnce(&mut SimulationConfig)) {
        let mut config = SimulationConfig::default();
        mutate(&mut config);
        let err = config.validate().expect_err(field);
        assert!(err.to_string().contains(field), "{field}: {err}");
    }

    #[test]
    fn rejects_invalid_values() {
        assert_rejected("particles.count", |c| c.particles.count = 0);
        assert_rejected("timing.dt", |c| c.timing.dt = 0.0);
        assert_rejected("timing.dt", |c| c.timing.dt = f32::NAN);
        assert_rejected("friction_half_life", |c| c.timing.friction_half_life = -1.0);
        assert_rejected("forces.r_max", |c| c.forces.r_max = 0.0);
        assert_rejected("forces.r_max", |c| c.forces.r_max = 0.6);
        assert_rejected("forces.beta", |c| c.forces.beta = 1.0);
        assert_rejected("force_factor", |c| c.forces.force_factor = f32::INFINITY);
        assert_rejected("record_interval_frames", |c| c.timing.record_interval_frames = 0);
        assert_rejected("reseed_every_frames", |c| c.engine.reseed_every_frames = Some(0));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SimulationConfig::load("definitely/not/here.toml").expect_err("missing file");
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn r_max_at_upper_bound_is_accepted() {
        let mut config = SimulationConfig::default();
        config.forces.r_max = 0.5;
        assert!(config.validate().is_ok());
        assert_eq!(config.get_sim_params().grid_dim, 2);
    }

    #[test]
    fn tiny_r_max_is_rejected_before_grid_overflows() {
        let mut config = SimulationConfig::default();
        config.forces.r_max = 1e-5;
        let err = config.validate().expect_err("100000x100000 grid overflows u32");
        assert!(err.to_string().contains("forces.r_max"), "{err}");

        config.forces.r_max = f32::MIN_POSITIVE;
        assert!(config.validate().is_err());

        config.forces.r_max = 1e-4;
        assert!(config.validate().is_ok());
        assert_eq!(config.get_sim_params().num_grid_cells, 100_000_000);
    }

    #[test]
    fn derived_params() {
        let params = SimulationConfig::default().get_sim_params();
        assert_eq!(params.grid_dim, 10);
        assert_eq!(params.num_grid_cells, 100);
        assert!((params.friction_factor - 0.5f32.powf(0.5)).abs() < 1e-6);
        assert!((params.force_scale - 0.2).abs() < 1e-6);
        assert!(params.grid_cell_size >= params.r_max);

        let mut config = SimulationConfig::default();
        config.forces.r_max = 0.3;
        let params = config.get_sim_params();
        assert_eq!(params.grid_dim, 3);
        assert!(params.grid_cell_size >= params.r_max);
    }
}
