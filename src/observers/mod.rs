// Observers receive progress from a running simulation

pub mod progress;

use crate::sim::{
    domain::FluidState,
    driver::{RunParameters, StepReport},
};

/// Reporting collaborator handed to the driver. Only `on_step` is required.
pub trait RunObserver {
    fn on_start(&mut self, _params: &RunParameters, _boundary: &str) {}

    fn on_step(&mut self, report: &StepReport);

    fn on_finish(&mut self, _state: &FluidState) {}
}

/// Discards all progress.
#[cfg(test)]
pub struct Silent;

#[cfg(test)]
impl RunObserver for Silent {
    fn on_step(&mut self, _report: &StepReport) {}
}
