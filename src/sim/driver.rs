// Time-stepping loop: runs the kernel until convergence or the iteration cap

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    observers::RunObserver,
    sim::{
        VectorField,
        boundary::{BodyForce, BoundaryCondition, BoundaryKind},
        convergence,
        domain::{FlowFields, Fluid, FluidState},
        error::{ConfigError, require_count, require_non_negative, require_positive},
        projection::Projection,
    },
};

/// Largest diffusion number `ν dt / dl²` for which the explicit scheme is
/// stable in 2D.
pub const MAX_DIFFUSION_NUMBER: f64 = 0.25;

/// Options controlling a single simulation run.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct RunParameters {
    /// Time step
    pub dt: f64,

    /// Jacobi sweeps of the pressure equation per step
    pub pressure_iterations: usize,

    /// Relative residual below which the run has converged
    pub tolerance: f64,

    /// Iteration cap
    pub max_iterations: usize,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            dt: 1e-6,
            pressure_iterations: 200,
            tolerance: 1e-3,
            max_iterations: 1000,
        }
    }
}

impl RunParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("dt", self.dt)?;
        require_non_negative("tolerance", self.tolerance)?;
        require_count("pressure iterations", self.pressure_iterations)?;
        require_count("max iterations", self.max_iterations)?;
        Ok(())
    }

    /// The explicit diffusion number `ν dt / dl²`.
    pub fn diffusion_number(&self, fluid: &Fluid) -> f64 {
        fluid.viscosity * self.dt / fluid.domain().dl().powi(2)
    }
}

/// How a run ended.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The residual dropped to the tolerance
    Converged,

    /// The iteration cap was hit first
    MaxIterationsReached,

    /// A field became non-finite
    Diverged,
}

/// Per-step progress, yielded by [`Simulation`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    pub iteration: usize,
    pub residual: f64,
    pub elapsed: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Init,
    Running,
    Finished(Termination),
}

/// Owns the fields of one run and steps them with the projection kernel.
/// Iterating yields one [`StepReport`] per kernel step until the run
/// terminates.
pub struct Simulation {
    kernel: Projection,
    boundary: Box<dyn BoundaryCondition>,
    params: RunParameters,
    fields: FlowFields,
    previous: VectorField,
    force: BodyForce,
    iteration: usize,
    residual: f64,
    started: Instant,
    elapsed: Duration,
    phase: Phase,
}

impl Simulation {
    /// Validate the run options and allocate zeroed fields for `fluid`.
    pub fn new(
        fluid: &Fluid,
        boundary: &BoundaryKind,
        params: &RunParameters,
    ) -> Result<Self, ConfigError> {
        params.validate()?;

        let diffusion_number = params.diffusion_number(fluid);
        if diffusion_number > MAX_DIFFUSION_NUMBER {
            warn!(
                "Diffusion number {diffusion_number:.3} exceeds {MAX_DIFFUSION_NUMBER}; \
                 the run is likely to diverge. Reduce dt or coarsen the grid."
            );
        }

        let (nx, ny) = fluid.domain().shape();
        let fields = FlowFields::zeros(nx, ny);
        let previous = fields.u.clone();

        Ok(Simulation {
            kernel: Projection::new(fluid, params.dt, params.pressure_iterations),
            boundary: boundary.build(fluid.domain()),
            params: *params,
            fields,
            previous,
            force: BodyForce::default(),
            iteration: 0,
            residual: f64::INFINITY,
            started: Instant::now(),
            elapsed: Duration::ZERO,
            phase: Phase::Init,
        })
    }

    pub fn boundary_name(&self) -> &'static str {
        self.boundary.name()
    }

    /// The fields as of the latest step.
    #[cfg(test)]
    pub fn fields(&self) -> &FlowFields {
        &self.fields
    }

    #[cfg(test)]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// `None` while the run is still going.
    pub fn termination(&self) -> Option<Termination> {
        match self.phase {
            Phase::Finished(termination) => Some(termination),
            _ => None,
        }
    }

    /// Run one kernel step and classify the state that results.
    fn advance(&mut self) -> StepReport {
        let outcome = self
            .kernel
            .step(&mut self.fields, self.boundary.as_ref(), self.force);

        self.previous = outcome.previous;
        self.force = outcome.force;
        self.iteration += 1;
        self.elapsed = self.started.elapsed();

        let diverged = !self.fields.is_finite();
        if diverged {
            // keep the last finite pressure and residual for publishing
            self.fields.p = outcome.previous_pressure;
        } else {
            self.residual = convergence::relative_residual(&self.fields.u, &self.previous);
        }

        self.phase = if diverged {
            Phase::Finished(Termination::Diverged)
        } else if self.residual <= self.params.tolerance {
            Phase::Finished(Termination::Converged)
        } else if self.iteration >= self.params.max_iterations {
            Phase::Finished(Termination::MaxIterationsReached)
        } else {
            Phase::Running
        };

        debug!(
            "iteration {} | residual {:.5e} | ΔKE {:.5e} | {:?}",
            self.iteration,
            self.residual,
            convergence::kinetic_energy_change(&self.fields.u, &self.previous),
            self.elapsed
        );

        StepReport {
            iteration: self.iteration,
            residual: self.residual,
            elapsed: self.elapsed,
        }
    }

    /// Drive the run to its end and hand over the final state: the pre-step
    /// velocity snapshot, so the published velocity matches the reported
    /// residual, together with the final pressure. A diverged run hands over
    /// the last finite pressure and residual instead.
    pub fn finish(mut self) -> FluidState {
        for _ in self.by_ref() {}

        let termination = self
            .termination()
            .unwrap_or(Termination::MaxIterationsReached);

        FluidState {
            fields: FlowFields {
                u: self.previous,
                p: self.fields.p,
            },
            iterations: self.iteration,
            residual: self.residual,
            elapsed: self.elapsed,
            termination,
        }
    }
}

impl Iterator for Simulation {
    type Item = StepReport;

    fn next(&mut self) -> Option<Self::Item> {
        match self.phase {
            Phase::Finished(_) => None,
            Phase::Init => {
                self.started = Instant::now();
                self.force = self.boundary.apply(&mut self.fields);
                Some(self.advance())
            }
            Phase::Running => Some(self.advance()),
        }
    }
}

/// Run a full simulation of `fluid` and publish the result into it.
///
/// Parameters
/// - `fluid` - The fluid and domain to simulate; receives the final state
/// - `boundary` - The boundary policy to apply
/// - `params` - Time step, sweep count and stopping criteria
/// - `observer` - Receives progress as the run goes
///
/// Returns
/// - How the run terminated; configuration errors are returned before any
///   step runs
pub fn run(
    fluid: &mut Fluid,
    boundary: &BoundaryKind,
    params: &RunParameters,
    observer: &mut dyn RunObserver,
) -> Result<Termination, ConfigError> {
    let mut simulation = Simulation::new(fluid, boundary, params)?;

    observer.on_start(params, simulation.boundary_name());

    for report in simulation.by_ref() {
        observer.on_step(&report);
    }

    let state = simulation.finish();
    let termination = state.termination;

    match termination {
        Termination::Converged => info!(
            "Converged after {} iterations (residual {:.5e}, {:.1?})",
            state.iterations, state.residual, state.elapsed
        ),
        Termination::MaxIterationsReached => info!(
            "Stopped at the iteration cap of {} (residual {:.5e}, {:.1?})",
            state.iterations, state.residual, state.elapsed
        ),
        Termination::Diverged => warn!(
            "Diverged at iteration {}; publishing the last finite state",
            state.iterations
        ),
    }

    observer.on_finish(&state);
    fluid.publish(state);

    Ok(termination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{observers::Silent, sim::domain::Domain};

    fn fluid(nx: usize, ny: usize, dl: f64, viscosity: f64) -> Fluid {
        Fluid::new(Domain::open(nx, ny, dl).unwrap(), 1., viscosity).unwrap()
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let fluid = fluid(5, 5, 0.1, 0.1);
        let lid = BoundaryKind::DrivenLid { lid_speed: 1. };

        let bad = [
            RunParameters { dt: 0., ..Default::default() },
            RunParameters { dt: -1e-3, ..Default::default() },
            RunParameters { pressure_iterations: 0, ..Default::default() },
            RunParameters { max_iterations: 0, ..Default::default() },
            RunParameters { tolerance: f64::NAN, ..Default::default() },
        ];

        for params in bad {
            assert!(Simulation::new(&fluid, &lid, &params).is_err(), "{params:?}");
        }
    }

    #[test]
    fn test_single_iteration_run() {
        let mut fluid = fluid(11, 11, 0.1, 0.1);
        let params = RunParameters {
            dt: 1e-3,
            pressure_iterations: 20,
            tolerance: 1e-6,
            max_iterations: 1,
        };

        let termination = run(
            &mut fluid,
            &BoundaryKind::DrivenLid { lid_speed: 1. },
            &params,
            &mut Silent,
        )
        .unwrap();

        let state = fluid.state().unwrap();
        assert_eq!(state.iterations, 1);
        assert!(state.residual.is_finite());
        assert_eq!(termination, Termination::MaxIterationsReached);
        assert_eq!(state.termination, termination);
    }

    #[test]
    fn test_start_from_rest_does_not_converge_immediately() {
        let fluid = fluid(8, 8, 0.1, 0.1);
        let params = RunParameters {
            dt: 1e-3,
            pressure_iterations: 5,
            tolerance: 1e-3,
            max_iterations: 3,
        };

        let mut simulation =
            Simulation::new(&fluid, &BoundaryKind::Channel { gx: 1. }, &params).unwrap();

        // the channel starts at rest, so the first residual is the sentinel
        let first = simulation.next().unwrap();
        assert_eq!(first.iteration, 1);
        assert_eq!(simulation.iteration(), 1);
        assert_eq!(first.residual, f64::INFINITY);
        assert_eq!(simulation.termination(), None);

        let state = simulation.finish();
        assert_eq!(state.iterations, 3);
        assert_eq!(state.termination, Termination::MaxIterationsReached);
    }

    #[test]
    fn test_publishes_pre_step_snapshot() {
        let fluid = fluid(9, 9, 0.1, 0.1);
        let params = RunParameters {
            dt: 1e-3,
            pressure_iterations: 10,
            tolerance: 0.,
            max_iterations: 4,
        };

        let mut simulation =
            Simulation::new(&fluid, &BoundaryKind::DrivenLid { lid_speed: 1. }, &params).unwrap();
        for _ in 0..3 {
            simulation.next();
        }
        let before_last = simulation.fields().u.clone();

        let state = simulation.finish();
        assert_eq!(state.iterations, 4);
        assert_eq!(state.fields.u, before_last);
    }

    #[test]
    fn test_diverging_run_is_reported() {
        // diffusion number 40, far past the explicit stability limit
        let mut fluid = fluid(12, 12, 0.05, 0.1);
        let params = RunParameters {
            dt: 1.,
            pressure_iterations: 5,
            tolerance: 1e-9,
            max_iterations: 1000,
        };

        let termination = run(
            &mut fluid,
            &BoundaryKind::DrivenLid { lid_speed: 1. },
            &params,
            &mut Silent,
        )
        .unwrap();

        assert_eq!(termination, Termination::Diverged);
        let state = fluid.state().unwrap();
        assert!(state.iterations < 1000);
        assert!(state.iterations > 1);
        assert!(state.fields.is_finite());
        assert!(state.residual.is_finite());
    }

    #[test]
    fn test_channel_approaches_poiseuille_profile() {
        // walls at y = 0 and y = H = 1
        let (nx, ny, dl, nu, gx) = (11, 21, 0.05, 0.1, 1.);
        let mut fluid = fluid(nx, ny, dl, nu);
        let params = RunParameters {
            dt: 0.002,
            pressure_iterations: 20,
            tolerance: 1e-7,
            max_iterations: 20_000,
        };

        run(&mut fluid, &BoundaryKind::Channel { gx }, &params, &mut Silent).unwrap();

        let state = fluid.state().unwrap();
        let height = (ny - 1) as f64 * dl;
        let poiseuille = |y: f64| gx / (2. * nu) * y * (height - y);

        let (mid_i, mid_j) = (nx / 2, ny / 2);
        let centre = state.fields.u[0][(mid_i, mid_j)];
        let expected = poiseuille(mid_j as f64 * dl);
        assert!(
            ((centre - expected) / expected).abs() < 0.05,
            "centreline velocity {centre} vs analytic {expected}"
        );

        for j in 1..ny - 1 {
            let expected = poiseuille(j as f64 * dl);
            let actual = state.fields.u[0][(mid_i, j)];
            assert!(((actual - expected) / expected).abs() < 0.05, "row {j}: {actual} vs {expected}");
            assert!(state.fields.u[1][(mid_i, j)].abs() < 1e-9);
        }
    }

    #[test]
    fn test_driven_cavity_recirculates() {
        let (n, dl) = (41, 0.05);
        let fluid = fluid(n, n, dl, 0.1);
        let params = RunParameters {
            dt: 1e-4,
            pressure_iterations: 50,
            tolerance: 1e-9,
            max_iterations: 2000,
        };

        let mut simulation =
            Simulation::new(&fluid, &BoundaryKind::DrivenLid { lid_speed: 1. }, &params).unwrap();

        while simulation.next().is_some() {
            let lid = simulation.fields().u[0].column(n - 1);
            assert!(lid.iter().all(|&u| u == 1.));
        }

        let state = simulation.finish();
        assert_eq!(state.iterations, 2000);
        assert_eq!(state.termination, Termination::MaxIterationsReached);
        assert!(state.fields.is_finite());

        let centreline = state.fields.u[0].row(n / 2);
        assert!(centreline[n - 2] > 0., "fluid under the lid follows it");

        let return_flow = (1..n - 1).map(|j| centreline[j]).fold(f64::INFINITY, f64::min);
        assert!(return_flow < 0., "no return flow below the lid: {return_flow}");
    }
}
