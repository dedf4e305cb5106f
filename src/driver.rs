use crate::integrator::StepReport;
use crate::simulation::{FrameView, Simulation};
use anyhow::Result;
use log::{error, info};
use particle_life_common::SimulationConfig;
use std::sync::{Arc, Mutex, MutexGuard};

/// Anything that consumes completed frames (renderers, recorders).
pub trait Presenter {
    fn present(&mut self, frame: &FrameView<'_>) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SeedRequest {
    generation: u64,
    seed: u32,
}

/// Shared, cloneable handle for asking the driver to restart with a new seed.
///
/// Requests only bump a generation token; the driver acts on the newest one
/// after its current step completes.
#[derive(Debug, Clone)]
pub struct ReseedControl {
    latest: Arc<Mutex<SeedRequest>>,
}

impl ReseedControl {
    pub fn new(initial_seed: u32) -> Self {
        Self { latest: Arc::new(Mutex::new(SeedRequest { generation: 0, seed: initial_seed })) }
    }

    fn lock(&self) -> MutexGuard<'_, SeedRequest> {
        // The guarded value is plain data, so a poisoned lock is still usable
        self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Requests a restart with `seed`. Returns the generation the request created.
    pub fn request(&self, seed: u32) -> u64 {
        let mut latest = self.lock();
        latest.generation += 1;
        latest.seed = seed;
        latest.generation
    }

    /// Newest requested `(generation, seed)`.
    pub fn latest(&self) -> (u64, u32) {
        let latest = self.lock();
        (latest.generation, latest.seed)
    }
}

/// Result of one `FrameDriver::advance` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame completed and the same simulation keeps running.
    Continued(StepReport),
    /// The frame completed, then the simulation was replaced by a fresh one.
    Reseeded { report: StepReport, generation: u64, seed: u32 },
}

/// Runs frames one at a time and swaps in a new simulation when a reseed is pending.
pub struct FrameDriver {
    config: SimulationConfig,
    control: ReseedControl,
    active: Simulation,
}

impl FrameDriver {
    /// Builds the first simulation from the control's current seed.
    pub fn new(config: SimulationConfig, control: ReseedControl) -> Result<Self> {
        let (generation, seed) = control.latest();
        let active = Simulation::new(&config, seed, generation)?;
        Ok(Self { config, control, active })
    }

    pub fn simulation(&self) -> &Simulation {
        &self.active
    }

    /// Steps the active simulation once, hands the frame to `presenter`, then
    /// checks for a pending reseed.
    ///
    /// Presenter failures are logged and do not affect the simulation.
    pub fn advance(&mut self, presenter: Option<&mut dyn Presenter>) -> Result<FrameOutcome> {
        let report = self.active.step();

        if let Some(presenter) = presenter {
            if let Err(e) = presenter.present(&self.active.frame()) {
                error!(
                    "Presenter failed on frame {} (generation {}): {:#}",
                    self.active.frame_index(),
                    self.active.generation(),
                    e
                );
            }
        }

        let (generation, seed) = self.control.latest();
        if generation == self.active.generation() {
            return Ok(FrameOutcome::Continued(report));
        }

        info!(
            "Reseed requested: replacing generation {} (seed {}) with generation {} (seed {}).",
            self.active.generation(),
            self.active.seed(),
            generation,
            seed
        );
        self.active = Simulation::new(&self.config, seed, generation)?;
        Ok(FrameOutcome::Reseeded { report, generation, seed })
    }
}
