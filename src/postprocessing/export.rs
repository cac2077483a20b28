// CSV export of the final fields

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::sim::domain::{Fluid, FluidState};

/// Write `x,y,Ux,Uy,p`, one row per grid point, `i` outermost.
pub fn write_csv<W: Write>(writer: &mut W, fluid: &Fluid, state: &FluidState) -> io::Result<()> {
    let domain = fluid.domain();
    let fields = &state.fields;

    writeln!(writer, "x,y,Ux,Uy,p")?;
    for i in 0..domain.nx() {
        for j in 0..domain.ny() {
            let (x, y) = domain.coordinates(i, j);
            writeln!(
                writer,
                "{x},{y},{},{},{}",
                fields.u[0][(i, j)],
                fields.u[1][(i, j)],
                fields.p[(i, j)]
            )?;
        }
    }

    Ok(())
}

pub fn export_csv(path: &Path, fluid: &Fluid, state: &FluidState) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_csv(&mut writer, fluid, state)?;
    writer.flush()
}
