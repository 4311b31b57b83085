use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use netgroup_core::diagnostics::Diagnostics;
use netgroup_export::csv::netlist_to_csv;

use crate::{
    files::{self, OutputArgs},
    many_to_many::FocusArgs,
};

#[derive(Args, Debug)]
pub struct NetlistToCsvArgs {
    /// Group netlist to convert
    #[arg(value_name = "NETLIST", value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    #[command(flatten)]
    pub focus: FocusArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn execute(args: NetlistToCsvArgs) -> Result<()> {
    let mut diagnostics = Diagnostics::default();
    let netlist = files::read_netlist(&args.input, &mut diagnostics)?;
    let csv = netlist_to_csv(
        &netlist,
        args.focus.glob()?.as_ref(),
        &args.focus.simplify(),
        files::now(),
    )?
    .unpack_into(&mut diagnostics);
    files::report(&diagnostics);
    args.output.emit(csv.as_bytes())
}
