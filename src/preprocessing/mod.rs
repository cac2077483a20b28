use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    preprocessing::{
        geometry::{GeometryError, cells_from_image, cells_from_obj},
        serial_mask::SerialMask,
    },
    sim::{
        boundary::BoundaryKind,
        domain::{Domain, Fluid},
        driver::RunParameters,
        error::ConfigError,
    },
};

pub mod cli;
pub mod geometry;
pub mod serial_mask;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("failed to access input file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed input file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "embedded mask is {mask_nx} x {mask_ny} but the grid is {grid_nx} x {grid_ny}"
    )]
    MaskShape {
        mask_nx: usize,
        mask_ny: usize,
        grid_nx: usize,
        grid_ny: usize,
    },
}

/// Where obstacle geometry comes from.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "source", rename_all = "kebab-case")]
pub enum GeometrySource {
    /// No internal obstructions
    Open,

    /// Vertices of a Wavefront OBJ file, quantized to the cell size
    Obj { path: PathBuf },

    /// Dark pixels of a PNG silhouette, one pixel per cell
    Png { path: PathBuf },

    /// Cells stored in the input file itself
    Inline { mask: SerialMask },
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct GridSettings {
    /// Points along x, boundary included
    pub nx: usize,

    /// Points along y, boundary included
    pub ny: usize,

    /// Uniform grid spacing
    pub cell_size: f64,
}

/// Fields that can be rendered after a run.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PlotField {
    Velocity,
    Pressure,
    Mask,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OutputSettings {
    pub output_dir: PathBuf,
    pub export_csv: bool,

    #[serde(default)]
    pub plots: Vec<PlotField>,
}

/// A complete, serializable description of one simulation run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SimulationInput {
    pub grid: GridSettings,
    pub geometry: GeometrySource,
    pub density: f64,
    pub viscosity: f64,
    pub boundary: BoundaryKind,

    #[serde(default)]
    pub run: RunParameters,

    pub output: OutputSettings,
}

impl SimulationInput {
    pub fn load(path: &Path) -> Result<Self, InputError> {
        let file = File::open(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn save(&self, path: &Path) -> Result<(), InputError> {
        let file = File::create(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the domain from the geometry source and fill it with fluid.
    pub fn build_fluid(&self) -> Result<Fluid, InputError> {
        let GridSettings { nx, ny, cell_size } = self.grid;

        let occupied: Vec<(usize, usize)> = match &self.geometry {
            GeometrySource::Open => {
                let domain = Domain::open(nx, ny, cell_size)?;
                return Ok(Fluid::new(domain, self.density, self.viscosity)?);
            }
            GeometrySource::Obj { path } => cells_from_obj(path, cell_size)?,
            GeometrySource::Png { path } => cells_from_image(path)?,
            GeometrySource::Inline { mask } => {
                let (mask_nx, mask_ny) = mask.shape();
                if (mask_nx, mask_ny) != (nx, ny) {
                    return Err(InputError::MaskShape {
                        mask_nx,
                        mask_ny,
                        grid_nx: nx,
                        grid_ny: ny,
                    });
                }
                mask.cells().collect()
            }
        };

        let domain = Domain::new(nx, ny, cell_size, occupied)?;
        Ok(Fluid::new(domain, self.density, self.viscosity)?)
    }

    /// A copy whose geometry no longer depends on external files.
    pub fn with_inline_geometry(&self, domain: &Domain) -> Self {
        SimulationInput {
            geometry: GeometrySource::Inline {
                mask: SerialMask::from_domain(domain),
            },
            ..self.clone()
        }
    }

    pub fn log(&self) {
        let boundary = serde_json::to_string(&self.boundary).unwrap_or_default();
        let geometry = match &self.geometry {
            GeometrySource::Open => "open".to_string(),
            GeometrySource::Obj { path } | GeometrySource::Png { path } => {
                format!("{}", path.display())
            }
            GeometrySource::Inline { .. } => "inline mask".to_string(),
        };

        info!(
            "Simulation is shown below:\n\n\
        \t grid:        {} x {} points, {} m spacing\n\
        \t geometry:    {}\n\
        \t boundary:    {}\n\
        \t density:     {} kg/m³\n\
        \t viscosity:   {} m²/s\n\
        \t time step:   {} s\n\
        \t sweeps:      {} per step\n\
        \t tolerance:   {}\n\
        \t iterations:  {} (max)\n\n\
        ",
            self.grid.nx,
            self.grid.ny,
            self.grid.cell_size,
            geometry,
            boundary,
            self.density,
            self.viscosity,
            self.run.dt,
            self.run.pressure_iterations,
            self.run.tolerance,
            self.run.max_iterations,
        );
    }
}
