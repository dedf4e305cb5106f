/// Default hand-over point between universal repulsion and the species bump.
pub const DEFAULT_BETA: f32 = 0.3;

/// Scalar pair force at normalised distance `r` (distance / r_max).
///
/// Below `beta` every pair repels, rising linearly from -1 at contact to 0 at
/// `beta`. Between `beta` and 1 the force is a triangular bump scaled by the
/// pair's `strength`, peaking at `(1 + beta) / 2`. Zero at and beyond 1.
#[inline(always)]
pub fn force(r: f32, strength: f32, beta: f32) -> f32 {
    if r < 0.0 || r >= 1.0 || r.is_nan() {
        0.0
    } else if r < beta {
        r / beta - 1.0
    } else {
        strength * (1.0 - (2.0 * r - 1.0 - beta).abs() / (1.0 - beta))
    }
}
