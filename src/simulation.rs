use crate::grid::SpatialIndex;
use crate::integrator::{Integrator, StepReport};
use crate::interaction::{species_count, InteractionMatrix};
use crate::particle_state::ParticleState;
use crate::rng::SplitMix32;
use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use particle_life_common::{SimParams, SimulationConfig, Snapshot, Vec2};

/// Read-only view of one completed frame, handed to presenters.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub frame: u64,
    pub time: f32,
    pub generation: u64,
    pub seed: u32,
    pub particle_count: usize,
    pub species_count: u32,
    pub pos_x: &'a [f32],
    pub pos_y: &'a [f32],
    pub species: &'a [u32],
    pub acc_x: &'a [f32],
    pub acc_y: &'a [f32],
}

impl FrameView<'_> {
    pub fn position(&self, idx: usize) -> Vec2 {
        Vec2::new(self.pos_x[idx], self.pos_y[idx])
    }

    pub fn acceleration(&self, idx: usize) -> Vec2 {
        Vec2::new(self.acc_x[idx], self.acc_y[idx])
    }

    pub fn mean_acceleration(&self) -> f32 {
        if self.particle_count == 0 {
            return 0.0;
        }
        let total: f32 = (0..self.particle_count).map(|i| self.acceleration(i).length()).sum();
        total / self.particle_count as f32
    }

    /// Copies the frame into a `Snapshot`; per-particle vectors only when asked.
    pub fn to_snapshot(&self, include_particles: bool) -> Snapshot {
        let pairs = |xs: &[f32], ys: &[f32]| -> Vec<(f32, f32)> {
            xs.iter().zip(ys.iter()).map(|(&x, &y)| (x, y)).collect()
        };
        Snapshot {
            frame: self.frame,
            time: self.time,
            seed: self.seed,
            generation: self.generation,
            particle_count: self.particle_count as u32,
            species_count: self.species_count,
            mean_acceleration: self.mean_acceleration(),
            positions: include_particles.then(|| pairs(self.pos_x, self.pos_y)),
            species: include_particles.then(|| self.species.to_vec()),
            accelerations: include_particles.then(|| pairs(self.acc_x, self.acc_y)),
        }
    }
}

/// One seeded particle-life run: everything derived from a single seed.
///
/// A reseed never mutates a `Simulation`; the driver builds a new one instead.
#[derive(Debug, Clone)]
pub struct Simulation {
    seed: u32,
    generation: u64,
    matrix: InteractionMatrix,
    state: ParticleState,
    index: SpatialIndex,
    integrator: Integrator,
    frame_index: u64,
    total_stale_removals: u64,
    last_report: StepReport,
}

impl Simulation {
    /// Validates `config` and builds the initial state for `seed`.
    ///
    /// Draw order from the seed: species count, interaction matrix, then per
    /// particle species, x and y.
    pub fn new(config: &SimulationConfig, seed: u32, generation: u64) -> Result<Self> {
        config.validate().context("Refusing to build simulation from invalid configuration")?;
        let params = config.get_sim_params();

        let mut rng = SplitMix32::new(seed);
        let species = species_count(&mut rng);
        let matrix = InteractionMatrix::build(&mut rng, species);
        let state = ParticleState::spawn(&mut rng, params.particle_count, species);
        let index = SpatialIndex::from_state(&params, &state);

        info!(
            "Simulation generation {} built from seed {}: {} particles, {} species, {}x{} grid.",
            generation, seed, state.len(), species, params.grid_dim, params.grid_dim
        );
        for a in 0..species {
            debug!("Interaction row {}: {:?}", a, matrix.row(a));
        }

        Ok(Self {
            seed,
            generation,
            matrix,
            state,
            index,
            integrator: Integrator::new(params, config.engine.parallel_forces),
            frame_index: 0,
            total_stale_removals: 0,
            last_report: StepReport::default(),
        })
    }

    /// Advances the simulation by one time step.
    pub fn step(&mut self) -> StepReport {
        let report = self.integrator.step(&mut self.state, &self.matrix, &mut self.index);
        self.frame_index += 1;

        if report.stale_removals > 0 {
            self.total_stale_removals += report.stale_removals as u64;
            warn!(
                "Frame {}: {} particles were missing from the spatial index before moving (re-inserted).",
                self.frame_index, report.stale_removals
            );
        }
        trace!(
            "Frame {} done: {} interacting pairs.",
            self.frame_index, report.interacting_pairs
        );

        self.last_report = report;
        report
    }

    /// Borrowed view of the current frame for presenters.
    pub fn frame(&self) -> FrameView<'_> {
        FrameView {
            frame: self.frame_index,
            time: self.frame_index as f32 * self.params().dt,
            generation: self.generation,
            seed: self.seed,
            particle_count: self.state.len(),
            species_count: self.matrix.species_count(),
            pos_x: &self.state.pos_x,
            pos_y: &self.state.pos_y,
            species: &self.state.species,
            acc_x: &self.state.acc_x,
            acc_y: &self.state.acc_y,
        }
    }

    /// Collects the current frame into a `Snapshot`.
    pub fn record_snapshot(&self, include_particles: bool) -> Snapshot {
        self.frame().to_snapshot(include_particles)
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn species_count(&self) -> u32 {
        self.matrix.species_count()
    }

    pub fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    pub fn state(&self) -> &ParticleState {
        &self.state
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn params(&self) -> &SimParams {
        self.integrator.params()
    }

    pub fn last_report(&self) -> StepReport {
        self.last_report
    }

    pub fn total_stale_removals(&self) -> u64 {
        self.total_stale_removals
    }
}
