use crate::particle_state::ParticleState;
use anyhow::Result;
use particle_life_common::{SimParams, Vec2};

/// Uniform grid over the unit torus bucketing particle indices by cell.
///
/// Buckets live in a flat arena addressed by `row * dim + col`. Alongside the
/// buckets the index remembers which bucket each particle was last inserted
/// into, so removal never has to re-derive a cell from a floating point
/// position that may have drifted across a boundary.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    dim: u32,
    cells_per_unit: f32, // == dim, kept as f32 for the hot path
    buckets: Vec<Vec<u32>>,
    resident: Vec<Option<u32>>,
}

impl SpatialIndex {
    /// Creates an empty index sized for `particle_count` particles.
    pub fn new(params: &SimParams, particle_count: usize) -> Self {
        let dim = params.grid_dim.max(1);
        Self {
            dim,
            cells_per_unit: dim as f32,
            buckets: vec![Vec::new(); dim as usize * dim as usize],
            resident: vec![None; particle_count],
        }
    }

    /// Creates an index and inserts every particle of `state` in index order.
    pub fn from_state(params: &SimParams, state: &ParticleState) -> Self {
        let mut index = Self::new(params, state.len());
        index.rebuild(state);
        index
    }

    pub fn dim(&self) -> u32 {
        self.dim
    }

    /// Grid cell `(row, col)` containing `pos`; row follows x, col follows y.
    #[inline(always)]
    pub fn cell_of(&self, pos: Vec2) -> (u32, u32) {
        (self.axis_cell(pos.x), self.axis_cell(pos.y))
    }

    #[inline(always)]
    fn axis_cell(&self, coord: f32) -> u32 {
        ((coord * self.cells_per_unit).floor() as i64).rem_euclid(self.dim as i64) as u32
    }

    #[inline(always)]
    fn bucket_id(&self, (row, col): (u32, u32)) -> u32 {
        row * self.dim + col
    }

    fn bucket_cell(&self, bucket: u32) -> (u32, u32) {
        (bucket / self.dim, bucket % self.dim)
    }

    /// Particle indices currently filed under `(row, col)`.
    pub fn cell_members(&self, cell: (u32, u32)) -> &[u32] {
        &self.buckets[self.bucket_id(cell) as usize]
    }

    /// Cell the particle was last inserted into, if it is resident.
    pub fn resident_cell(&self, idx: u32) -> Option<(u32, u32)> {
        self.resident
            .get(idx as usize)
            .copied()
            .flatten()
            .map(|bucket| self.bucket_cell(bucket))
    }

    /// Files particle `idx` under the cell containing `pos`.
    ///
    /// A particle resident in another cell is moved; re-inserting into the same
    /// cell leaves the bucket unchanged, so an index never appears twice.
    pub fn insert(&mut self, idx: u32, pos: Vec2) {
        let target = self.bucket_id(self.cell_of(pos));
        let slot = idx as usize;
        if slot >= self.resident.len() {
            self.resident.resize(slot + 1, None);
        }

        let current = self.resident[slot];
        match current {
            Some(current) if current == target => return,
            Some(_) => {
                self.remove(idx);
            }
            None => {}
        }

        self.buckets[target as usize].push(idx);
        self.resident[slot] = Some(target);
    }

    /// Removes particle `idx` from the cell it resides in.
    ///
    /// Returns `false` and changes nothing when the particle is not resident.
    pub fn remove(&mut self, idx: u32) -> bool {
        let Some(bucket) = self.resident.get(idx as usize).copied().flatten() else {
            log::debug!("Ignoring removal of particle {} which is not in the spatial index.", idx);
            return false;
        };

        let members = &mut self.buckets[bucket as usize];
        match members.iter().position(|&member| member == idx) {
            Some(at) => {
                // Order-preserving so bucket iteration order only depends on history
                members.remove(at);
                self.resident[idx as usize] = None;
                true
            }
            None => {
                log::error!(
                    "Particle {} recorded in bucket {} but missing from it; clearing residency.",
                    idx, bucket
                );
                self.resident[idx as usize] = None;
                false
            }
        }
    }

    /// Empties every bucket and re-inserts all particles of `state` in index order.
    pub fn rebuild(&mut self, state: &ParticleState) {
        self.buckets.iter_mut().for_each(|bucket| bucket.clear());
        self.resident.clear();
        self.resident.resize(state.len(), None);
        for idx in 0..state.len() {
            self.insert(idx as u32, state.position(idx));
        }
    }

    /// Distinct wrapped neighbours of `center` along one axis (itself included).
    #[inline(always)]
    fn axis_neighbourhood(&self, center: u32) -> ([u32; 3], usize) {
        match self.dim {
            1 => ([0, 0, 0], 1),
            2 => ([center, 1 - center, 0], 2),
            dim => ([(center + dim - 1) % dim, center, (center + 1) % dim], 3),
        }
    }

    /// Calls `f` for every particle in the 3x3 wrapped neighbourhood of `cell`.
    ///
    /// Each distinct cell is visited once, rows outer and columns inner, members in
    /// bucket order.
    #[inline(always)]
    pub fn for_each_in_neighbourhood<F>(&self, cell: (u32, u32), mut f: F)
    where
        F: FnMut(u32),
    {
        let (rows, row_count) = self.axis_neighbourhood(cell.0);
        let (cols, col_count) = self.axis_neighbourhood(cell.1);

        for &row in &rows[..row_count] {
            for &col in &cols[..col_count] {
                for &member in self.cell_members((row, col)) {
                    f(member);
                }
            }
        }
    }

    /// Calls `f` for every neighbour candidate of particle `idx`, including `idx`.
    /// Does nothing for a particle that is not resident.
    #[inline(always)]
    pub fn for_each_candidate<F>(&self, idx: u32, f: F)
    where
        F: FnMut(u32),
    {
        if let Some(cell) = self.resident_cell(idx) {
            self.for_each_in_neighbourhood(cell, f);
        }
    }

    /// Fresh list of every neighbour candidate of particle `idx`, including `idx`.
    pub fn neighbors(&self, idx: u32) -> Vec<u32> {
        let mut out = Vec::new();
        self.for_each_candidate(idx, |j| out.push(j));
        out
    }

    /// Number of particles in each bucket, row-major.
    pub fn occupancy(&self) -> Vec<usize> {
        self.buckets.iter().map(|bucket| bucket.len()).collect()
    }

    /// Verifies every particle sits in exactly one bucket matching its position.
    pub fn check_consistency(&self, state: &ParticleState) -> Result<()> {
        let mut seen = vec![0u32; state.len()];
        for (bucket_id, bucket) in self.buckets.iter().enumerate() {
            for &member in bucket {
                let slot = member as usize;
                if slot >= state.len() {
                    anyhow::bail!("Bucket {} holds unknown particle {}.", bucket_id, member);
                }
                seen[slot] += 1;
                let expected = self.bucket_id(self.cell_of(state.position(slot)));
                if expected as usize != bucket_id {
                    anyhow::bail!(
                        "Particle {} filed in bucket {} but its position maps to bucket {}.",
                        member, bucket_id, expected
                    );
                }
                if self.resident.get(slot).copied().flatten() != Some(bucket_id as u32) {
                    anyhow::bail!("Particle {} residency record disagrees with bucket {}.", member, bucket_id);
                }
            }
        }
        if let Some((idx, count)) = seen.iter().enumerate().find(|&(_, &count)| count != 1) {
            anyhow::bail!("Particle {} appears in {} buckets.", idx, count);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SplitMix32;
    use particle_life_common::SimulationConfig;

    fn params_with_r_max(r_max: f32) -> SimParams {
        let mut config = SimulationConfig::default();
        config.forces.r_max = r_max;
        config.get_sim_params()
    }

    fn state_at(points: &[(f32, f32)]) -> ParticleState {
        let mut state = ParticleState::with_capacity(points.len());
        for &(x, y) in points {
            state.push(0, Vec2::new(x, y), Vec2::zero());
        }
        state
    }

    #[test]
    fn cell_of_maps_positions() {
        let index = SpatialIndex::new(&params_with_r_max(0.1), 0);
        assert_eq!(index.dim(), 10);
        assert_eq!(index.cell_of(Vec2::new(0.0, 0.0)), (0, 0));
        assert_eq!(index.cell_of(Vec2::new(0.15, 0.95)), (1, 9));
        assert_eq!(index.cell_of(Vec2::new(0.999_999, 0.5)), (9, 5));
        // out-of-range inputs wrap instead of indexing past the arena
        assert_eq!(index.cell_of(Vec2::new(1.0, -0.05)), (0, 9));
    }

    #[test]
    fn rebuild_files_every_particle_once() {
        let params = params_with_r_max(0.1);
        let state = ParticleState::spawn(&mut SplitMix32::new(8), 400, 3);
        let index = SpatialIndex::from_state(&params, &state);
        assert_eq!(index.occupancy().iter().sum::<usize>(), 400);
        index.check_consistency(&state).expect("consistent after rebuild");
    }

    #[test]
    fn neighbours_cover_wrapped_3x3_block() {
        let params = params_with_r_max(0.1);
        let state = state_at(&[
            (0.05, 0.05), // 0: corner cell (0, 0)
            (0.95, 0.95), // 1: diagonally across the wrap
            (0.05, 0.95), // 2: across the y wrap
            (0.15, 0.15), // 3: ordinary neighbour
            (0.55, 0.55), // 4: far away
        ]);
        let index = SpatialIndex::from_state(&params, &state);

        let mut found = index.neighbors(0);
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2, 3]);
        assert_eq!(index.neighbors(4), vec![4]);
    }

    #[test]
    fn small_grid_visits_each_cell_once() {
        // r_max 0.5 gives a 2x2 grid where -1 and +1 wrap to the same cell
        let params = params_with_r_max(0.5);
        let state = state_at(&[(0.1, 0.1), (0.6, 0.1), (0.1, 0.6), (0.6, 0.6)]);
        let index = SpatialIndex::from_state(&params, &state);
        assert_eq!(index.dim(), 2);

        let mut found = index.neighbors(0);
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2, 3]);
    }

    #[test]
    fn insert_moves_between_cells() {
        let params = params_with_r_max(0.1);
        let state = state_at(&[(0.05, 0.05)]);
        let mut index = SpatialIndex::from_state(&params, &state);

        index.insert(0, Vec2::new(0.55, 0.55));
        assert_eq!(index.resident_cell(0), Some((5, 5)));
        assert!(index.cell_members((0, 0)).is_empty());
        assert_eq!(index.cell_members((5, 5)), &[0]);

        // same-cell re-insert does not duplicate
        index.insert(0, Vec2::new(0.56, 0.57));
        assert_eq!(index.cell_members((5, 5)), &[0]);
    }

    #[test]
    fn removing_absent_index_is_a_no_op() {
        let params = params_with_r_max(0.1);
        let state = state_at(&[(0.05, 0.05), (0.06, 0.05), (0.5, 0.5)]);
        let mut index = SpatialIndex::from_state(&params, &state);

        assert!(index.remove(1));
        let before = index.occupancy();
        assert!(!index.remove(1));
        assert!(!index.remove(99));
        assert_eq!(index.occupancy(), before);
        assert_eq!(index.cell_members((0, 0)), &[0]);
        assert_eq!(index.cell_members((5, 5)), &[2]);
        assert!(index.neighbors(1).is_empty());
    }

    #[test]
    fn removal_preserves_member_order() {
        let params = params_with_r_max(0.1);
        let state = state_at(&[(0.01, 0.01), (0.02, 0.02), (0.03, 0.03), (0.04, 0.04)]);
        let mut index = SpatialIndex::from_state(&params, &state);
        assert!(index.remove(1));
        assert_eq!(index.cell_members((0, 0)), &[0, 2, 3]);
    }

    #[test]
    fn consistency_check_detects_stale_cell() {
        let params = params_with_r_max(0.1);
        let mut state = state_at(&[(0.05, 0.05)]);
        let index = SpatialIndex::from_state(&params, &state);
        state.pos_x[0] = 0.75;
        assert!(index.check_consistency(&state).is_err());
    }
}
