// Grid, occupancy mask and the fluid model that receives a run's results

use std::time::Duration;

use na::DMatrix;
use tracing::{debug, warn};

use crate::sim::{
    ScalarField, VectorField,
    driver::Termination,
    error::{ConfigError, MIN_GRID_POINTS, require_non_negative, require_positive},
};

/// A uniform 2D grid of `nx x ny` points spaced `dl` apart, with an
/// immutable occupancy mask. `true` in the mask marks a solid cell; the
/// outer ring is always flagged.
#[derive(Clone, Debug, PartialEq)]
pub struct Domain {
    solid_mask: DMatrix<bool>,
    dl: f64,
}

impl Domain {
    /// Build a domain from a set of occupied grid indices.
    ///
    /// Parameters
    /// - `nx`, `ny` - The number of points along each axis, boundary included
    /// - `dl` - The uniform grid spacing
    /// - `occupied` - `(i, j)` indices of solid cells; indices outside the
    ///   grid are skipped
    pub fn new(
        nx: usize,
        ny: usize,
        dl: f64,
        occupied: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self, ConfigError> {
        if nx < MIN_GRID_POINTS || ny < MIN_GRID_POINTS {
            return Err(ConfigError::GridTooSmall { nx, ny });
        }
        let dl = require_positive("cell size", dl)?;

        let mut solid_mask = DMatrix::from_element(nx, ny, false);

        let mut skipped = 0usize;
        for (i, j) in occupied {
            if i < nx && j < ny {
                solid_mask[(i, j)] = true;
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            warn!("{skipped} occupied cells fall outside the {nx} x {ny} grid and were ignored");
        }

        // boundary flag on the outer ring
        solid_mask.row_mut(0).fill(true);
        solid_mask.row_mut(nx - 1).fill(true);
        solid_mask.column_mut(0).fill(true);
        solid_mask.column_mut(ny - 1).fill(true);

        let domain = Domain { solid_mask, dl };
        debug!(
            "Built {nx} x {ny} domain with {} interior obstruction cells",
            domain.obstruction_cells().count()
        );

        Ok(domain)
    }

    /// A domain with no internal obstructions.
    pub fn open(nx: usize, ny: usize, dl: f64) -> Result<Self, ConfigError> {
        Self::new(nx, ny, dl, std::iter::empty())
    }

    pub fn nx(&self) -> usize {
        self.solid_mask.nrows()
    }

    pub fn ny(&self) -> usize {
        self.solid_mask.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.solid_mask.shape()
    }

    pub fn dl(&self) -> f64 {
        self.dl
    }

    pub fn solid_mask(&self) -> &DMatrix<bool> {
        &self.solid_mask
    }

    pub fn is_solid(&self, i: usize, j: usize) -> bool {
        self.solid_mask[(i, j)]
    }

    /// Interior cells flagged solid; these are the cells the obstructed-flow
    /// condition acts on. The outer ring is excluded.
    pub fn obstruction_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (nx, ny) = self.shape();
        (1..ny - 1)
            .flat_map(move |j| (1..nx - 1).map(move |i| (i, j)))
            .filter(|&(i, j)| self.solid_mask[(i, j)])
    }

    /// Physical coordinates `(x, y)` of the grid point `(i, j)`.
    pub fn coordinates(&self, i: usize, j: usize) -> (f64, f64) {
        (i as f64 * self.dl, j as f64 * self.dl)
    }
}

/// Velocity and pressure on a shared grid.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowFields {
    /// `[Ux, Uy]`
    pub u: VectorField,

    /// Specific pressure (pressure / density)
    pub p: ScalarField,
}

impl FlowFields {
    pub fn zeros(nx: usize, ny: usize) -> Self {
        FlowFields {
            u: [ScalarField::zeros(nx, ny), ScalarField::zeros(nx, ny)],
            p: ScalarField::zeros(nx, ny),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.p.shape()
    }

    pub fn is_finite(&self) -> bool {
        self.u
            .iter()
            .chain(std::iter::once(&self.p))
            .all(|field| field.iter().all(|v| v.is_finite()))
    }
}

/// Final state of a run, published once the driver terminates.
#[derive(Clone, Debug)]
pub struct FluidState {
    /// Pre-step velocity snapshot and the final pressure
    pub fields: FlowFields,
    pub iterations: usize,
    pub residual: f64,
    pub elapsed: Duration,
    pub termination: Termination,
}

/// The fluid filling a domain. Receives the result of a simulation run.
#[derive(Clone, Debug)]
pub struct Fluid {
    domain: Domain,

    /// The fluid density
    pub density: f64,

    /// The kinematic viscosity
    pub viscosity: f64,

    state: Option<FluidState>,
}

impl Fluid {
    pub fn new(domain: Domain, density: f64, viscosity: f64) -> Result<Self, ConfigError> {
        Ok(Fluid {
            domain,
            density: require_positive("density", density)?,
            viscosity: require_non_negative("viscosity", viscosity)?,
            state: None,
        })
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Replace the published state with the result of a finished run.
    pub fn publish(&mut self, state: FluidState) {
        debug_assert_eq!(state.fields.shape(), self.domain.shape());
        self.state = Some(state);
    }

    /// The latest published run, if any.
    pub fn state(&self) -> Option<&FluidState> {
        self.state.as_ref()
    }
}
