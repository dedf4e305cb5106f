use serde::{Deserialize, Serialize};

/// Simulation parameters derived from the configuration, used on every step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    pub particle_count: u32,

    // Time
    pub dt: f32,
    pub friction_factor: f32, // 0.5^(dt / half_life), applied once per step

    // Forces
    pub r_max: f32,
    pub force_scale: f32, // r_max * force_factor
    pub beta: f32,

    // Grid (square, cells at least r_max wide)
    pub grid_dim: u32,
    pub grid_cell_size: f32,
    pub num_grid_cells: u32,
}
