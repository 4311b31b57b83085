use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use netgroup_core::diagnostics::Diagnostics;
use netgroup_export::codegen::render;

use crate::files::{self, OutputArgs};

#[derive(Args, Debug)]
pub struct CodegenArgs {
    /// Group netlist the template is rendered against
    #[arg(value_name = "NETLIST", value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Template to render. It may include or import other templates from the
    /// template directory.
    #[arg(value_name = "TEMPLATE", value_hint = clap::ValueHint::FilePath)]
    pub template: PathBuf,

    /// Directory templates are loaded from [default: the template's directory]
    #[arg(long, alias = "template-dir-env", value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub template_dir: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn execute(args: CodegenArgs) -> Result<()> {
    let mut diagnostics = Diagnostics::default();
    let netlist = files::read_netlist(&args.input, &mut diagnostics)?;
    let rendered = render(&netlist, &args.template, args.template_dir.as_deref())
        .with_context(|| format!("Failed to render {}", args.template.display()))?
        .unpack_into(&mut diagnostics);
    files::report(&diagnostics);
    args.output.emit(rendered.as_bytes())
}
