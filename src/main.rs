use std::{error::Error, process::exit};

extern crate nalgebra as na;

mod observers;
mod postprocessing;
mod preprocessing;
mod sim;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{observers::progress::ConsoleProgress, preprocessing::cli::CliArgs};

fn solve(args: &CliArgs) -> Result<(), Box<dyn Error>> {
    let input = args.create_input()?;
    input.log();

    let mut fluid = input.build_fluid()?;

    if let Some(savepath) = args.input_json_savepath() {
        input.with_inline_geometry(fluid.domain()).save(savepath)?;
        info!("Saved input file to {}", savepath.display());
    }

    let mut progress = ConsoleProgress::new();
    sim::driver::run(&mut fluid, &input.boundary, &input.run, &mut progress)?;

    postprocessing::postprocess(&input.output, &fluid)?;

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = CliArgs::parse();

    if let Err(err) = solve(&args) {
        error!("{err}");
        exit(1);
    }
}
