// Explicit projection step: Jacobi pressure relaxation + velocity correction

use rayon::prelude::*;

use crate::sim::{
    ScalarField, VectorField,
    boundary::{BodyForce, BoundaryCondition},
    domain::{FlowFields, Fluid},
    numeric,
};

/// Result of one kernel step.
pub struct StepOutcome {
    /// Velocity before this step's update
    pub previous: VectorField,

    /// Pressure before this step's relaxation
    pub previous_pressure: ScalarField,

    /// Body force returned by the boundary policy after the step; feeds the
    /// next step
    pub force: BodyForce,
}

/// One macro time step of the projection method on a uniform grid.
///
/// No stability (CFL / diffusion number) check happens here; a `dt` that is
/// too large for the grid spacing and viscosity diverges silently.
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    /// Time step
    pub dt: f64,

    /// Grid spacing (`dx = dy`)
    pub dl: f64,

    pub density: f64,

    pub viscosity: f64,

    /// Number of Jacobi sweeps per step
    pub pressure_iterations: usize,
}

impl Projection {
    pub fn new(fluid: &Fluid, dt: f64, pressure_iterations: usize) -> Self {
        Projection {
            dt,
            dl: fluid.domain().dl(),
            density: fluid.density,
            viscosity: fluid.viscosity,
            pressure_iterations,
        }
    }

    /// Advance `fields` by one time step and re-apply the boundary policy.
    ///
    /// Parameters
    /// - `fields` - The current velocity and pressure, updated in place
    /// - `boundary` - The active boundary policy
    /// - `force` - The body force returned by the last policy application
    pub fn step(
        &self,
        fields: &mut FlowFields,
        boundary: &dyn BoundaryCondition,
        force: BodyForce,
    ) -> StepOutcome {
        let previous = fields.u.clone();
        let previous_pressure = fields.p.clone();

        self.relax_pressure(&mut fields.p, &previous);
        self.correct_velocity(fields, &previous, force);

        let force = boundary.apply(fields);

        StepOutcome {
            previous,
            previous_pressure,
            force,
        }
    }

    /// The source of the discrete pressure-Poisson equation, scaled by the
    /// stencil weight. Built from central differences of the frozen velocity;
    /// zero on the edges.
    ///
    /// Mathematically, this is
    /// ρ dl²/4 · [ (1/dt)(∂u/∂x + ∂v/∂y) - (∂u/∂x)² - (∂v/∂y)² - 2 (∂u/∂y)(∂v/∂x) ]
    pub fn pressure_source(&self, u: &VectorField) -> ScalarField {
        let (nx, ny) = u[0].shape();
        let (ux, uy) = (&u[0], &u[1]);
        let (dl, dt) = (self.dl, self.dt);
        let weight = self.density * dl.powi(2) / 4.;

        ScalarField::from_fn(nx, ny, |i, j| {
            if i == 0 || j == 0 || i == nx - 1 || j == ny - 1 {
                return 0.;
            }
            let node = (i, j);

            let du_dx = numeric::central_x(ux, node, dl);
            let dv_dy = numeric::central_y(uy, node, dl);
            let du_dy = numeric::central_y(ux, node, dl);
            let dv_dx = numeric::central_x(uy, node, dl);

            weight
                * ((du_dx + dv_dy) / dt
                    - du_dx.powi(2)
                    - dv_dy.powi(2)
                    - 2. * du_dy * dv_dx)
        })
    }

    /// Run `pressure_iterations` Jacobi sweeps on `p`. Edge cells are left as
    /// they are.
    pub fn relax_pressure(&self, p: &mut ScalarField, u: &VectorField) {
        let source = self.pressure_source(u);

        // both buffers share the edge values, which no sweep touches
        let mut scratch = p.clone();
        for _ in 0..self.pressure_iterations {
            std::mem::swap(p, &mut scratch);
            jacobi_sweep(&scratch, &source, p);
        }
    }

    /// Overwrite the interior of `fields.u` from the frozen velocity
    /// `previous` and the freshly relaxed pressure.
    pub fn correct_velocity(&self, fields: &mut FlowFields, previous: &VectorField, force: BodyForce) {
        let (nx, ny) = fields.shape();
        let (dt, dl, rho, nu) = (self.dt, self.dl, self.density, self.viscosity);
        let (ux_, uy_) = (&previous[0], &previous[1]);
        let p = &fields.p;

        let [ux, uy] = &mut fields.u;

        // columns are contiguous in the column-major storage
        ux.as_mut_slice()
            .par_chunks_mut(nx)
            .zip(uy.as_mut_slice().par_chunks_mut(nx))
            .enumerate()
            .filter(|(j, _)| *j > 0 && *j < ny - 1)
            .for_each(|(j, (ux_col, uy_col))| {
                for i in 1..nx - 1 {
                    let node = (i, j);
                    let (u, v) = (ux_[node], uy_[node]);

                    ux_col[i] = u
                        - dt * (u * numeric::backward_x(ux_, node, dl)
                            + v * numeric::backward_y(ux_, node, dl))
                        - dt / rho * numeric::central_x(p, node, dl)
                        + nu * dt * numeric::laplacian(ux_, node, dl, dl)
                        + dt * force.gx;

                    uy_col[i] = v
                        - dt * (u * numeric::backward_x(uy_, node, dl)
                            + v * numeric::backward_y(uy_, node, dl))
                        - dt / rho * numeric::central_y(p, node, dl)
                        + nu * dt * numeric::laplacian(uy_, node, dl, dl)
                        + dt * force.gy;
                }
            });
    }
}

/// One Jacobi sweep: every interior node of `next` becomes the mean of its
/// four neighbours in `previous`, minus the scaled source.
fn jacobi_sweep(previous: &ScalarField, source: &ScalarField, next: &mut ScalarField) {
    let (nx, ny) = previous.shape();
    let prev = previous.as_slice();
    let src = source.as_slice();

    next.as_mut_slice()
        .par_chunks_mut(nx)
        .enumerate()
        .filter(|(j, _)| *j > 0 && *j < ny - 1)
        .for_each(|(j, column)| {
            for i in 1..nx - 1 {
                let k = i + j * nx;
                column[i] = 0.25 * (prev[k + 1] + prev[k - 1] + prev[k + nx] + prev[k - nx])
                    - src[k];
            }
        });
}
