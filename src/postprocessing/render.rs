// Renders a scalar field to a PNG with the obstacle mask overlaid

use std::{error::Error, path::Path};

use plotters::prelude::*;

use crate::sim::{ScalarField, domain::Domain};

const SOLID_COLOR: RGBColor = RGBColor(0, 0, 0);

/// Map `value` from `[min, max]` onto a blue-white-red ramp.
pub fn diverging_color(value: f64, min: f64, max: f64) -> RGBColor {
    let span = max - min;
    let t = if span > 0. && span.is_finite() && value.is_finite() {
        ((value - min) / span).clamp(0., 1.)
    } else {
        0.5
    };

    if t < 0.5 {
        let k = (255. * t / 0.5).round() as u8;
        RGBColor(k, k, 255)
    } else {
        let k = (255. * (1. - t) / 0.5).round() as u8;
        RGBColor(255, k, k)
    }
}

/// Save `field` as a bitmap, one pixel per grid point, `j = 0` at the bottom.
/// Solid cells are drawn black.
///
/// Parameters
/// - `field` - The scalar field to draw
/// - `domain` - The domain providing the obstacle mask
/// - `path` - The output PNG file
pub fn render_field(field: &ScalarField, domain: &Domain, path: &Path) -> Result<(), Box<dyn Error>> {
    let (nx, ny) = field.shape();

    let root = BitMapBackend::new(path, (nx as u32, ny as u32)).into_drawing_area();
    root.fill(&WHITE)?;

    let finite = field.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    for i in 0..nx {
        for j in 0..ny {
            let color = if domain.is_solid(i, j) && i > 0 && j > 0 && i < nx - 1 && j < ny - 1 {
                SOLID_COLOR
            } else {
                diverging_color(field[(i, j)], min, max)
            };

            root.draw_pixel((i as i32, (ny - 1 - j) as i32), &color)?;
        }
    }
    root.present()?;

    Ok(())
}

/// Save the obstacle mask alone: solid cells black, fluid white.
pub fn render_mask(domain: &Domain, path: &Path) -> Result<(), Box<dyn Error>> {
    let (nx, ny) = domain.shape();

    let root = BitMapBackend::new(path, (nx as u32, ny as u32)).into_drawing_area();
    root.fill(&WHITE)?;

    for (i, j) in domain.obstruction_cells() {
        root.draw_pixel((i as i32, (ny - 1 - j) as i32), &SOLID_COLOR)?;
    }
    root.present()?;

    Ok(())
}
