/// Inner radius fraction below which every pair repels.
pub const BETA: f64 = 0.3;

/// Radial force magnitude for a pair at normalized distance `norm_r = r / rmax`.
///
/// Below `beta` the force ramps linearly from -1 to 0 whatever the colors.
/// Between `beta` and 1 it is a triangular lobe scaled by `attraction`,
/// peaking at `(1 + beta) / 2`. Pairs at or beyond `rmax` feel nothing.
pub fn force(norm_r: f64, attraction: f64, beta: f64) -> f64 {
    if norm_r < beta {
        norm_r / beta - 1.0
    } else if norm_r < 1.0 {
        attraction * (1.0 - (2.0 * norm_r - 1.0 - beta).abs() / (1.0 - beta))
    } else {
        0.0
    }
}
