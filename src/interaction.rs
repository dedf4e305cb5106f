use crate::rng::SplitMix32;

pub const MIN_SPECIES: u32 = 2;
pub const MAX_SPECIES: u32 = 8;

/// Draws the number of species for a run, uniformly from `MIN_SPECIES..=MAX_SPECIES`.
pub fn species_count(rng: &mut SplitMix32) -> u32 {
    let span = (MAX_SPECIES - MIN_SPECIES + 1) as f32;
    // next_unit() < 1, so the floor is at most span - 1; min() guards the cast anyway
    ((rng.next_unit() * span).floor() as u32).min(MAX_SPECIES - MIN_SPECIES) + MIN_SPECIES
}

/// Asymmetric species-to-species attraction table.
///
/// `strength(a, b)` is how strongly species `a` is pulled toward (positive) or
/// pushed away from (negative) species `b`; it need not equal `strength(b, a)`.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMatrix {
    species_count: u32,
    strengths: Vec<f32>, // row-major, species_count x species_count
}

impl InteractionMatrix {
    /// Draws `species_count^2` strengths in `[-1, 1)`, row by row.
    pub fn build(rng: &mut SplitMix32, species_count: u32) -> Self {
        let m = species_count as usize;
        let strengths = (0..m * m).map(|_| rng.next_unit() * 2.0 - 1.0).collect();
        Self { species_count, strengths }
    }

    pub fn species_count(&self) -> u32 {
        self.species_count
    }

    #[inline(always)]
    pub fn strength(&self, from: u32, to: u32) -> f32 {
        self.strengths[from as usize * self.species_count as usize + to as usize]
    }

    /// Borrowed view of one species' row.
    pub fn row(&self, from: u32) -> &[f32] {
        let m = self.species_count as usize;
        let start = from as usize * m;
        &self.strengths[start..start + m]
    }

    pub fn len(&self) -> usize {
        self.strengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty()
    }
}
