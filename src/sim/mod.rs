// Explicit projection-method solver for 2D incompressible flow

pub mod boundary;
pub mod convergence;
pub mod domain;
pub mod driver;
pub mod error;
pub mod numeric;
pub mod projection;

use na::DMatrix;

/// A dense `Nx x Ny` grid of values, indexed `[(i, j)]` with `i` along x.
pub type ScalarField = DMatrix<f64>;

/// The `[x, y]` components of a collocated vector field.
pub type VectorField = [ScalarField; 2];
