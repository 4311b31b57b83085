use std::{collections::BTreeSet, path::PathBuf};

use anyhow::Result;
use clap::Args;
use netgroup_core::{
    GroupGlob, GroupMap, PinName, diagnostics::Diagnostics, map::many_to_many,
};
use netgroup_xml::map_to_xml;

use crate::files::{self, OutputArgs};

/// Selection and simplification shared by the many-to-many outputs.
#[derive(Args, Debug)]
pub struct FocusArgs {
    /// Only list groups matching this glob, and only their links to groups
    /// that don't match. Use `**` to match several path segments.
    #[arg(long, value_name = "GLOB")]
    pub root_group_glob: Option<String>,

    /// Collapse a pin's partners into one pin when any partner's name contains
    /// one of these, e.g. `GND`. Comma separated.
    #[arg(long, value_name = "PIN", value_delimiter = ',')]
    pub simplify_pins: Vec<PinName>,
}

impl FocusArgs {
    pub fn glob(&self) -> Result<Option<GroupGlob>> {
        Ok(self
            .root_group_glob
            .as_deref()
            .map(GroupGlob::compile)
            .transpose()?)
    }

    pub fn simplify(&self) -> BTreeSet<PinName> {
        self.simplify_pins.iter().cloned().collect()
    }
}

#[derive(Args, Debug)]
pub struct ManyToManyArgs {
    /// Group netlist to map
    #[arg(value_name = "NETLIST", value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    #[command(flatten)]
    pub focus: FocusArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn execute(args: ManyToManyArgs) -> Result<()> {
    let mut diagnostics = Diagnostics::default();
    let netlist = files::read_netlist(&args.input, &mut diagnostics)?;
    let map = many_to_many(
        &netlist,
        args.focus.glob()?.as_ref(),
        &args.focus.simplify(),
        files::now(),
    )?
    .unpack_into(&mut diagnostics);
    let bytes = map_to_xml(&GroupMap::ManyToMany(map))?;
    files::report(&diagnostics);
    args.output.emit(&bytes)
}
