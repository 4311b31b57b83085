use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use netgroup_core::{
    GroupGlob,
    diagnostics::Diagnostics,
    merge::{PinMapping, connect_netlist, merge_netlists},
};
use netgroup_xml::netlist_to_xml;

use crate::files::{self, OutputArgs};

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum PinMappingArg {
    /// Pins with the same name are joined
    #[default]
    Equal,
    /// Odd pins join the next even pin: 1-2, 3-4, ...
    #[value(alias = "even_odd")]
    EvenOdd,
}

impl From<PinMappingArg> for PinMapping {
    fn from(arg: PinMappingArg) -> Self {
        match arg {
            PinMappingArg::Equal => PinMapping::Equal,
            PinMappingArg::EvenOdd => PinMapping::EvenOdd,
        }
    }
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Group netlists to merge, each from a different schematic
    #[arg(value_name = "NETLIST", required = true, value_hint = clap::ValueHint::FilePath)]
    pub inputs: Vec<PathBuf>,

    /// Groups matching this glob are plugged into each other (repeatable).
    /// Use `**` to match several path segments.
    #[arg(long = "connect", value_name = "GLOB")]
    pub connect: Vec<String>,

    /// Which pins of connected groups are joined
    #[arg(long, value_enum, default_value_t = PinMappingArg::Equal)]
    pub pin_mapping: PinMappingArg,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn execute(args: MergeArgs) -> Result<()> {
    let mut diagnostics = Diagnostics::default();
    let netlists = args
        .inputs
        .iter()
        .map(|path| files::read_netlist(path, &mut diagnostics))
        .collect::<Result<Vec<_>>>()?;
    let connectors = args
        .connect
        .iter()
        .map(|glob| GroupGlob::compile(glob))
        .collect::<netgroup_core::Result<Vec<_>>>()?;

    let merged = merge_netlists(netlists, files::now()).context("Failed to merge netlists")?;
    let connected = connect_netlist(merged, &connectors, args.pin_mapping.into())
        .context("Failed to connect groups")?
        .unpack_into(&mut diagnostics);

    let bytes = netlist_to_xml(&connected)?;
    files::report(&diagnostics);
    args.output.emit(&bytes)
}
