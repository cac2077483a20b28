// Stopping criteria based on the change of velocity between steps

use crate::sim::VectorField;

/// Velocity norms below this count as a fluid at rest.
pub const NEGLIGIBLE_NORM: f64 = 1e-12;

/// Euclidean norm of both components stacked into one vector.
fn stacked_norm(field: &VectorField) -> f64 {
    (field[0].norm_squared() + field[1].norm_squared()).sqrt()
}

/// Relative residual ‖U - U_‖ / ‖U_‖ of the velocity between two steps.
///
/// Returns `f64::INFINITY` when the previous velocity is (numerically) zero so
/// that a run starting from rest never reports convergence.
///
/// Parameters
/// - `current` - The velocity after the step
/// - `previous` - The velocity before the step
pub fn relative_residual(current: &VectorField, previous: &VectorField) -> f64 {
    let previous_norm = stacked_norm(previous);
    if previous_norm < NEGLIGIBLE_NORM {
        return f64::INFINITY;
    }

    let change: VectorField = [&current[0] - &previous[0], &current[1] - &previous[1]];

    stacked_norm(&change) / previous_norm
}

/// Fractional change of the (summed) kinetic energy per component, |Σ 1 - (ΣU_)²/(ΣU)²|.
/// Components that sum to zero are skipped. Sign-cancelling flows make this
/// a weak criterion; it is kept as a diagnostic next to the relative residual.
pub fn kinetic_energy_change(current: &VectorField, previous: &VectorField) -> f64 {
    let mut change = 0.;

    for (now, before) in current.iter().zip(previous) {
        let now_sum = now.sum();
        if now_sum != 0. {
            change += 1. - before.sum().powi(2) / now_sum.powi(2);
        }
    }

    change.abs()
}
