use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use netgroup_core::{GroupIdentifier, GroupMap, diagnostics::Diagnostics, map::one_to_many};
use netgroup_xml::map_to_xml;

use crate::files::{self, OutputArgs};

#[derive(Args, Debug)]
pub struct OneToManyArgs {
    /// Group netlist to map
    #[arg(value_name = "NETLIST", value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Root group as `<schematic><path><type>`, e.g. `main/conn/Header`
    #[arg(value_name = "ROOT_GROUP")]
    pub root: GroupIdentifier,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn execute(args: OneToManyArgs) -> Result<()> {
    let mut diagnostics = Diagnostics::default();
    let netlist = files::read_netlist(&args.input, &mut diagnostics)?;
    let map = one_to_many(&netlist, &args.root, files::now())?.unpack_into(&mut diagnostics);
    let bytes = map_to_xml(&GroupMap::OneToMany(map))?;
    files::report(&diagnostics);
    args.output.emit(&bytes)
}
