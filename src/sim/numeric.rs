// Finite-difference stencils on a uniform grid

use crate::sim::{ScalarField, VectorField};

/// Second-order central difference **in the x axis** at an interior node.
///
/// Parameters:
/// - `field` - The scalar field to differentiate
/// - `(i, j)` - The interior node; `1 <= i < Nx - 1`
/// - `dx` - The size of the elements in the x-axis
#[inline]
pub fn central_x(field: &ScalarField, (i, j): (usize, usize), dx: f64) -> f64 {
    (field[(i + 1, j)] - field[(i - 1, j)]) / (2.0 * dx)
}

/// Second-order central difference **in the y axis** at an interior node.
#[inline]
pub fn central_y(field: &ScalarField, (i, j): (usize, usize), dy: f64) -> f64 {
    (field[(i, j + 1)] - field[(i, j - 1)]) / (2.0 * dy)
}

/// First-order backward difference **in the x axis**; always differences
/// against the `i - 1` neighbour.
#[inline]
pub fn backward_x(field: &ScalarField, (i, j): (usize, usize), dx: f64) -> f64 {
    (field[(i, j)] - field[(i - 1, j)]) / dx
}

/// First-order backward difference **in the y axis**; always differences
/// against the `j - 1` neighbour.
#[inline]
pub fn backward_y(field: &ScalarField, (i, j): (usize, usize), dy: f64) -> f64 {
    (field[(i, j)] - field[(i, j - 1)]) / dy
}

/// The 5-point laplacian ∇²f = ∂²f/∂x² + ∂²f/∂y² at an interior node.
#[inline]
pub fn laplacian(field: &ScalarField, (i, j): (usize, usize), dx: f64, dy: f64) -> f64 {
    let center = field[(i, j)];
    let d2f_dx2 = (field[(i + 1, j)] - 2.0 * center + field[(i - 1, j)]) / dx.powi(2);
    let d2f_dy2 = (field[(i, j + 1)] - 2.0 * center + field[(i, j - 1)]) / dy.powi(2);

    d2f_dx2 + d2f_dy2
}

/// Compute the divergence of some vector field F=<u,v>. That is, ∇⋅F
///
/// Interior nodes use central differences; edge nodes are left at zero
/// since they are owned by the boundary conditions.
///
/// Parameters:
/// - `field` - The `VectorField` to take the divergence of
/// - `dl` - The (uniform) grid spacing
///
/// Returns:
///     A `ScalarField` of the divergence.
pub fn divergence(field: &VectorField, dl: f64) -> ScalarField {
    let (nx, ny) = field[0].shape();

    ScalarField::from_fn(nx, ny, |i, j| {
        if i == 0 || j == 0 || i == nx - 1 || j == ny - 1 {
            return 0.;
        }
        central_x(&field[0], (i, j), dl) + central_y(&field[1], (i, j), dl)
    })
}

/// Pointwise magnitude |F| of a vector field.
pub fn magnitude(field: &VectorField) -> ScalarField {
    field[0].zip_map(&field[1], |u, v| u.hypot(v))
}
