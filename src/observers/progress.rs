// Console progress bar for the solver loop

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::{
    observers::RunObserver,
    sim::{
        domain::FluidState,
        driver::{RunParameters, StepReport},
    },
};

const TEMPLATE: &str =
    "[Elapsed: {elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} iterations | {msg}";

/// Draws an `indicatif` bar over the iteration budget. The bar hides itself
/// when stderr is not a terminal.
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        let bar = ProgressBar::new(0);
        bar.set_style(style);

        ConsoleProgress { bar }
    }
}

impl RunObserver for ConsoleProgress {
    fn on_start(&mut self, params: &RunParameters, boundary: &str) {
        self.bar.set_length(params.max_iterations as u64);
        self.bar.set_position(0);
        info!(
            "Solving {boundary}: dt = {}, {} pressure sweeps, tolerance {:e}",
            params.dt, params.pressure_iterations, params.tolerance
        );
    }

    fn on_step(&mut self, report: &StepReport) {
        self.bar.set_position(report.iteration as u64);
        self.bar.set_message(format!("U residual {:.5e}", report.residual));
    }

    fn on_finish(&mut self, state: &FluidState) {
        self.bar.finish_and_clear();

        let seconds = state.elapsed.as_secs();
        info!(
            "iteration: {} | U residual: {:.5} | elapsed time: {}m {}s",
            state.iterations,
            state.residual,
            seconds / 60,
            seconds % 60
        );
    }
}
