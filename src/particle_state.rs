use crate::rng::SplitMix32;
use particle_life_common::Vec2;

/// Holds the per-particle simulation state as structure-of-arrays vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleState {
    /// Species id per particle, fixed after spawning.
    pub species: Vec<u32>,

    // Positions on the unit torus, always in [0, 1) between steps
    pub pos_x: Vec<f32>,
    pub pos_y: Vec<f32>,

    // Velocities (unbounded)
    pub vel_x: Vec<f32>,
    pub vel_y: Vec<f32>,

    // Velocity change over the last step, only read by presenters
    pub acc_x: Vec<f32>,
    pub acc_y: Vec<f32>,
}

impl ParticleState {
    /// Places `count` particles uniformly on the torus with random species.
    ///
    /// Per particle the draws are species, then x, then y.
    pub fn spawn(rng: &mut SplitMix32, count: u32, species_count: u32) -> Self {
        let n = count as usize;
        let mut state = Self::with_capacity(n);

        for _ in 0..n {
            let species = ((rng.next_unit() * species_count as f32).floor() as u32)
                .min(species_count.saturating_sub(1));
            let x = rng.next_unit();
            let y = rng.next_unit();
            state.push(species, Vec2::new(x, y), Vec2::zero());
        }

        state
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            species: Vec::with_capacity(capacity),
            pos_x: Vec::with_capacity(capacity),
            pos_y: Vec::with_capacity(capacity),
            vel_x: Vec::with_capacity(capacity),
            vel_y: Vec::with_capacity(capacity),
            acc_x: Vec::with_capacity(capacity),
            acc_y: Vec::with_capacity(capacity),
        }
    }

    /// Appends a particle. The position is wrapped onto the torus.
    pub fn push(&mut self, species: u32, position: Vec2, velocity: Vec2) {
        let position = position.wrapped();
        self.species.push(species);
        self.pos_x.push(position.x);
        self.pos_y.push(position.y);
        self.vel_x.push(velocity.x);
        self.vel_y.push(velocity.y);
        self.acc_x.push(0.0);
        self.acc_y.push(0.0);
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    #[inline(always)]
    pub fn position(&self, idx: usize) -> Vec2 {
        Vec2::new(self.pos_x[idx], self.pos_y[idx])
    }

    #[inline(always)]
    pub fn velocity(&self, idx: usize) -> Vec2 {
        Vec2::new(self.vel_x[idx], self.vel_y[idx])
    }

    #[inline(always)]
    pub fn acceleration(&self, idx: usize) -> Vec2 {
        Vec2::new(self.acc_x[idx], self.acc_y[idx])
    }

    pub fn set_velocity(&mut self, idx: usize, velocity: Vec2) {
        self.vel_x[idx] = velocity.x;
        self.vel_y[idx] = velocity.y;
    }
}
