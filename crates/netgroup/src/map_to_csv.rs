use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use netgroup_core::diagnostics::Diagnostics;
use netgroup_export::csv::map_to_csv;

use crate::files::{self, OutputArgs};

#[derive(Args, Debug)]
pub struct MapToCsvArgs {
    /// Many-to-many map to convert
    #[arg(value_name = "MAP", value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn execute(args: MapToCsvArgs) -> Result<()> {
    let mut diagnostics = Diagnostics::default();
    let map = files::read_map(&args.input, &mut diagnostics)?;
    let csv = map_to_csv(&map)?;
    files::report(&diagnostics);
    args.output.emit(csv.as_bytes())
}
