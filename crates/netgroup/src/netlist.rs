use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use netgroup_core::{
    Flavor, Validation,
    diagnostics::Diagnostics,
    netlister::{NetlisterOptions, group_netlist},
};
use netgroup_xml::{kicad::parse_component_netlist, netlist_to_xml};

use crate::files::{self, OutputArgs};

#[derive(Args, Debug)]
pub struct NetlistArgs {
    /// KiCad XML netlist export of the root schematic
    #[arg(value_name = "KICAD_XML", value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Replace characters not allowed in identifiers with `_` instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Use the snippet vocabulary (`SnippetType` fields, `snippetNetlist` output)
    #[arg(long)]
    pub snippet: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn execute(args: NetlistArgs) -> Result<()> {
    let components = parse_component_netlist(&files::read_text(&args.input)?)
        .with_context(|| format!("Failed to parse KiCad netlist {}", args.input.display()))?;
    let options = NetlisterOptions {
        flavor: if args.snippet {
            Flavor::Snippet
        } else {
            Flavor::Group
        },
        validation: if args.lenient {
            Validation::Lenient
        } else {
            Validation::Strict
        },
    };

    let mut diagnostics = Diagnostics::default();
    let netlist = group_netlist(&components, options, files::now())?.unpack_into(&mut diagnostics);
    let bytes = netlist_to_xml(&netlist)?;
    files::report(&diagnostics);
    args.output.emit(&bytes)
}
