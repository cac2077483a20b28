// Loads obstacle geometry as a set of occupied grid indices

use std::{fs, io, path::Path, path::PathBuf};

use image::{GenericImageView, ImageReader, Pixel};
use thiserror::Error;

const THRESHOLD_LUMA: u8 = 127;

/// Snap tolerance for coordinates that are a whole number of cells apart.
const SNAP_EPSILON: f64 = 1e-9;

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("failed to read geometry file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed vertex on line {line}: {text:?}")]
    MalformedVertex { line: usize, text: String },

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Map a coordinate onto a cell index by truncation, treating values within
/// `SNAP_EPSILON` of a cell boundary as exact. Negative coordinates have no
/// cell.
fn quantize(coordinate: f64, cell_size: f64) -> Option<usize> {
    let scaled = coordinate / cell_size;
    let snapped = scaled.round();
    let cell = if (scaled - snapped).abs() < SNAP_EPSILON {
        snapped
    } else {
        scaled.trunc()
    };

    (cell >= 0. && cell.is_finite()).then_some(cell as usize)
}

/// Parse the `v x y [z ...]` vertex lines of a Wavefront OBJ document and
/// project them onto the xy-plane grid. All other lines are ignored.
///
/// Parameters
/// - `text` - The OBJ document
/// - `cell_size` - The grid spacing vertices are quantized to
///
/// Returns
/// - The `(i, j)` cells holding at least one vertex
pub fn parse_obj_vertices(text: &str, cell_size: f64) -> Result<Vec<(usize, usize)>, GeometryError> {
    let mut cells = Vec::new();

    for (n, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("v") {
            continue;
        }

        let malformed = || GeometryError::MalformedVertex {
            line: n + 1,
            text: line.to_string(),
        };

        let mut coordinate = || -> Result<f64, GeometryError> {
            tokens
                .next()
                .and_then(|t| t.parse::<f64>().ok())
                .ok_or_else(malformed)
        };
        let (x, y) = (coordinate()?, coordinate()?);

        if let (Some(i), Some(j)) = (quantize(x, cell_size), quantize(y, cell_size)) {
            cells.push((i, j));
        }
    }

    cells.sort_unstable();
    cells.dedup();

    Ok(cells)
}

/// Read an OBJ file and quantize its vertices; see [`parse_obj_vertices`].
pub fn cells_from_obj(path: &Path, cell_size: f64) -> Result<Vec<(usize, usize)>, GeometryError> {
    let text = fs::read_to_string(path).map_err(|source| GeometryError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_obj_vertices(&text, cell_size)
}

/// Load occupied cells from a PNG silhouette by looking at pixel luminosity;
/// dark pixels are solid. Pixel columns map to `i`, and rows are flipped so
/// the bottom of the image is `j = 0`.
pub fn cells_from_image(path: &Path) -> Result<Vec<(usize, usize)>, GeometryError> {
    let image = ImageReader::open(path)
        .map_err(|source| GeometryError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .decode()?;

    let height = image.height();

    Ok(image
        .pixels()
        .filter(|(_, _, color)| color.to_luma().0[0] < THRESHOLD_LUMA)
        .map(|(x, y, _)| (x as usize, (height - 1 - y) as usize))
        .collect())
}
