// Contains post-processers for a finished simulation

pub mod export;
pub mod render;

use std::{error::Error, fs, path::PathBuf};

use tracing::{info, warn};

use crate::{
    preprocessing::{OutputSettings, PlotField},
    sim::{
        domain::{Fluid, FluidState},
        numeric,
    },
};

/// File stem carrying the run statistics, e.g. `export_it-120_re-0.00091_t-0m4s`.
fn output_stem(prefix: &str, state: &FluidState) -> String {
    let seconds = state.elapsed.as_secs();
    format!(
        "{prefix}_it-{}_re-{:.5}_t-{}m{}s",
        state.iterations,
        state.residual,
        seconds / 60,
        seconds % 60
    )
}

/// Export and render the published state of `fluid` as requested.
pub fn postprocess(settings: &OutputSettings, fluid: &Fluid) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let Some(state) = fluid.state() else {
        warn!("Nothing to postprocess; the fluid holds no simulation result");
        return Ok(Vec::new());
    };

    let divergence = numeric::divergence(&state.fields.u, fluid.domain().dl());
    info!(
        "Final velocity divergence: max |∇⋅U| = {:.5e}",
        divergence.amax()
    );

    if !settings.export_csv && settings.plots.is_empty() {
        return Ok(Vec::new());
    }
    fs::create_dir_all(&settings.output_dir)?;

    let mut written = Vec::new();

    if settings.export_csv {
        let path = settings
            .output_dir
            .join(format!("{}.csv", output_stem("export", state)));
        export::export_csv(&path, fluid, state)?;
        info!("Exported fields to {}", path.display());
        written.push(path);
    }

    for plot in &settings.plots {
        let name = match plot {
            PlotField::Velocity => "velocity",
            PlotField::Pressure => "pressure",
            PlotField::Mask => "mask",
        };
        let path = settings
            .output_dir
            .join(format!("{}.png", output_stem(&format!("plot-{name}"), state)));

        match plot {
            PlotField::Velocity => {
                render::render_field(&numeric::magnitude(&state.fields.u), fluid.domain(), &path)?
            }
            PlotField::Pressure => render::render_field(&state.fields.p, fluid.domain(), &path)?,
            PlotField::Mask => render::render_mask(fluid.domain(), &path)?,
        }
        info!("Plotted {name} to {}", path.display());
        written.push(path);
    }

    Ok(written)
}
