use crate::force::force;
use crate::grid::SpatialIndex;
use crate::interaction::InteractionMatrix;
use crate::particle_state::ParticleState;
use particle_life_common::{wrap_unit, SimParams, Vec2};
use rayon::prelude::*;

/// What happened during one integration step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Particles that were not found in the spatial index when they were about to move.
    pub stale_removals: u32,
    /// Ordered pairs (i, j) closer than r_max that contributed a force.
    pub interacting_pairs: u64,
}

/// Net (unscaled) force on particle `idx` from every candidate within `r_max`.
///
/// Returns the summed force and the number of contributing neighbours.
/// Candidates are summed in spatial-index order, which is stable between runs.
#[inline(always)]
pub fn net_force(
    idx: usize,
    state: &ParticleState,
    matrix: &InteractionMatrix,
    index: &SpatialIndex,
    params: &SimParams,
) -> (Vec2, u32) {
    let pos = state.position(idx);
    let species = state.species[idx];
    let mut total = Vec2::zero();
    let mut contributors = 0u32;

    index.for_each_candidate(idx as u32, |neighbour| {
        let j = neighbour as usize;
        if j == idx {
            return;
        }
        let d = pos.min_image_to(state.position(j));
        let r = d.length();

        // Coincident particles have no direction; out-of-range ones do not interact
        if r > 0.0 && r < params.r_max {
            let f = force(r / params.r_max, matrix.strength(species, state.species[j]), params.beta);
            total += Vec2::new(d.x / r, d.y / r) * f;
            contributors += 1;
        }
    });

    (total, contributors)
}

/// Advances particle state by one time step.
#[derive(Debug, Clone)]
pub struct Integrator {
    params: SimParams,
    parallel: bool,
    forces: Vec<Vec2>, // scratch, one slot per particle
}

impl Integrator {
    pub fn new(params: SimParams, parallel: bool) -> Self {
        Self { params, parallel, forces: Vec::new() }
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Runs one full step: forces from pre-step positions, velocity update, then
    /// the move-and-reindex pass.
    pub fn step(
        &mut self,
        state: &mut ParticleState,
        matrix: &InteractionMatrix,
        index: &mut SpatialIndex,
    ) -> StepReport {
        let interacting_pairs = self.accumulate_forces(state, matrix, index);
        self.update_velocities(state);
        let stale_removals = self.move_particles(state, index);

        StepReport { stale_removals, interacting_pairs }
    }

    /// Phase 1: net force per particle, read-only over positions.
    ///
    /// Each particle's sum is computed independently and in the same order either
    /// way, so the rayon path is bit-identical to the serial one.
    fn accumulate_forces(
        &mut self,
        state: &ParticleState,
        matrix: &InteractionMatrix,
        index: &SpatialIndex,
    ) -> u64 {
        let n = state.len();
        self.forces.clear();
        self.forces.resize(n, Vec2::zero());
        let params = &self.params;
        let scale = params.force_scale;

        if self.parallel {
            self.forces
                .par_iter_mut()
                .enumerate()
                .map(|(idx, force_out)| {
                    let (total, contributors) = net_force(idx, state, matrix, index, params);
                    *force_out = total * scale;
                    contributors as u64
                })
                .sum()
        } else {
            self.forces
                .iter_mut()
                .enumerate()
                .map(|(idx, force_out)| {
                    let (total, contributors) = net_force(idx, state, matrix, index, params);
                    *force_out = total * scale;
                    contributors as u64
                })
                .sum()
        }
    }

    /// Phase 2: friction then impulse; acceleration records the velocity change.
    fn update_velocities(&self, state: &mut ParticleState) {
        let friction = self.params.friction_factor;
        let dt = self.params.dt;

        for (idx, force) in self.forces.iter().enumerate() {
            let old_x = state.vel_x[idx];
            let old_y = state.vel_y[idx];
            let new_x = old_x * friction + force.x * dt;
            let new_y = old_y * friction + force.y * dt;
            state.vel_x[idx] = new_x;
            state.vel_y[idx] = new_y;
            state.acc_x[idx] = new_x - old_x;
            state.acc_y[idx] = new_y - old_y;
        }
    }

    /// Phase 3: remove, move with wrap, re-insert, one particle at a time.
    /// Returns how many removals found nothing to remove.
    fn move_particles(&self, state: &mut ParticleState, index: &mut SpatialIndex) -> u32 {
        let dt = self.params.dt;
        let mut stale_removals = 0u32;

        for idx in 0..state.len() {
            if !index.remove(idx as u32) {
                stale_removals += 1;
            }

            let x = wrap_unit(state.pos_x[idx] + state.vel_x[idx] * dt);
            let y = wrap_unit(state.pos_y[idx] + state.vel_y[idx] * dt);
            state.pos_x[idx] = x;
            state.pos_y[idx] = y;

            index.insert(idx as u32, Vec2::new(x, y));
        }

        stale_removals
    }
}
