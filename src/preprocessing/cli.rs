use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use crate::{
    preprocessing::{
        GeometrySource, GridSettings, InputError, OutputSettings, PlotField, SimulationInput,
    },
    sim::{boundary::BoundaryKind, driver::RunParameters},
};

const DEFAULT_OUTPUT_DIR: &str = "projflow-output";

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryArg {
    /// Flow around the obstacle geometry, open outer edges
    Flow,
    /// Lid-driven cavity
    Lid,
    /// Channel between two walls, driven by a body force
    Channel,
}

// Raw, CLI input
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    #[arg(help = "Obstacle geometry: a Wavefront .obj file or a .png silhouette.")]
    geometry_path: Option<PathBuf>,

    #[arg(long, help = "An input file with pre-loaded parameters.")]
    input_json: Option<PathBuf>,

    #[arg(long, help = "Optional path to save the resolved input file to.")]
    input_json_savepath: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "flow", help = "Boundary conditions to apply.")]
    boundary: BoundaryArg,

    #[arg(long, default_value = "101", help = "Grid points along x, boundary included.")]
    nx: usize,

    #[arg(long, default_value = "51", help = "Grid points along y, boundary included.")]
    ny: usize,

    #[arg(long, default_value = "0.01", help = "Grid spacing in m.")]
    cell_size: f64,

    #[arg(long, default_value = "0.0", help = "Body force along x (flow and channel).")]
    gx: f64,

    #[arg(long, default_value = "0.0", help = "Body force along y (flow only).")]
    gy: f64,

    #[arg(long, default_value = "1.0", help = "Lid speed in m/s (lid only).")]
    lid_speed: f64,

    #[arg(long, default_value = "1.0", help = "Fluid density in kg/m³")]
    density: f64,

    #[arg(long, default_value = "0.1", help = "Kinematic viscosity in m²/s")]
    viscosity: f64,

    #[arg(long, default_value = "1e-6", help = "Time step in seconds.")]
    dt: f64,

    #[arg(long, default_value = "200", help = "Jacobi pressure sweeps per step.")]
    pressure_iterations: usize,

    #[arg(long, default_value = "1e-3", help = "Relative residual to stop at.")]
    tolerance: f64,

    #[arg(long, default_value = "1000", help = "Maximum number of iterations.")]
    max_iterations: usize,

    #[arg(long, help = "Directory for exports and plots.")]
    output_dir: Option<PathBuf>,

    #[arg(long, help = "Export the final fields as CSV.")]
    export_csv: bool,

    #[arg(long, value_enum, help = "Fields to render after solving.")]
    plot: Vec<PlotArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlotArg {
    Velocity,
    Pressure,
    Mask,
}

impl From<PlotArg> for PlotField {
    fn from(arg: PlotArg) -> Self {
        match arg {
            PlotArg::Velocity => PlotField::Velocity,
            PlotArg::Pressure => PlotField::Pressure,
            PlotArg::Mask => PlotField::Mask,
        }
    }
}

fn geometry_from_path(path: &Path) -> GeometrySource {
    let is_png = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));

    if is_png {
        GeometrySource::Png {
            path: path.to_path_buf(),
        }
    } else {
        GeometrySource::Obj {
            path: path.to_path_buf(),
        }
    }
}

impl CliArgs {
    pub fn input_json_savepath(&self) -> Option<&Path> {
        self.input_json_savepath.as_deref()
    }

    pub fn create_input(&self) -> Result<SimulationInput, InputError> {
        // if the input file is supplied, just use that
        if let Some(input_filepath) = &self.input_json {
            info!("Using input file {}", input_filepath.display());

            let mut loaded_input = SimulationInput::load(input_filepath)?;

            if let Some(geometry_path) = &self.geometry_path {
                warn!(
                    "Overriding the input file geometry with {}",
                    geometry_path.display()
                );
                loaded_input.geometry = geometry_from_path(geometry_path);
            }

            return Ok(loaded_input);
        }

        // otherwise, build the input from the other arguments
        let geometry = match &self.geometry_path {
            Some(path) => geometry_from_path(path),
            None => GeometrySource::Open,
        };

        let boundary = match self.boundary {
            BoundaryArg::Flow => BoundaryKind::ObstructedFlow {
                gx: self.gx,
                gy: self.gy,
            },
            BoundaryArg::Lid => BoundaryKind::DrivenLid {
                lid_speed: self.lid_speed,
            },
            BoundaryArg::Channel => BoundaryKind::Channel { gx: self.gx },
        };

        Ok(SimulationInput {
            grid: GridSettings {
                nx: self.nx,
                ny: self.ny,
                cell_size: self.cell_size,
            },
            geometry,
            density: self.density,
            viscosity: self.viscosity,
            boundary,
            run: RunParameters {
                dt: self.dt,
                pressure_iterations: self.pressure_iterations,
                tolerance: self.tolerance,
                max_iterations: self.max_iterations,
            },
            output: OutputSettings {
                output_dir: self
                    .output_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
                export_csv: self.export_csv,
                plots: self.plot.iter().map(|&p| p.into()).collect(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lid_from_flags() {
        let args = CliArgs::parse_from([
            "projflow",
            "--boundary",
            "lid",
            "--lid-speed",
            "2.5",
            "--nx",
            "41",
            "--ny",
            "41",
            "--plot",
            "velocity",
            "--plot",
            "pressure",
        ]);

        let input = args.create_input().unwrap();
        assert_eq!(input.boundary, BoundaryKind::DrivenLid { lid_speed: 2.5 });
        assert_eq!(input.geometry, GeometrySource::Open);
        assert_eq!((input.grid.nx, input.grid.ny), (41, 41));
        assert_eq!(input.run, RunParameters::default());
        assert_eq!(input.output.plots, vec![PlotField::Velocity, PlotField::Pressure]);
        assert_eq!(input.output.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn test_geometry_kind_from_extension() {
        let args = CliArgs::parse_from(["projflow", "wing.obj", "--gx", "3"]);
        let input = args.create_input().unwrap();

        assert_eq!(
            input.geometry,
            GeometrySource::Obj {
                path: PathBuf::from("wing.obj")
            }
        );
        assert_eq!(input.boundary, BoundaryKind::ObstructedFlow { gx: 3., gy: 0. });

        assert!(matches!(
            geometry_from_path(Path::new("shape.PNG")),
            GeometrySource::Png { .. }
        ));
    }

    #[test]
    fn test_missing_input_file() {
        let missing = std::env::temp_dir().join("projflow-no-such-input.json");
        let args = CliArgs::parse_from(["projflow", "--input-json", missing.to_str().unwrap()]);

        assert!(matches!(args.create_input(), Err(InputError::Io { .. })));
    }
}
