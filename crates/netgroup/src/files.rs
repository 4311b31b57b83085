//! Reading inputs and writing outputs shared by every subcommand.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{Local, NaiveDateTime, Timelike};
use clap::Args;
use colored::Colorize;
use netgroup_core::{GroupMap, Netlist, diagnostics::Diagnostics};

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Write to this file instead of standard output
    #[arg(short, long, value_name = "PATH", value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

impl OutputArgs {
    /// Write the complete output in one step. Files are replaced atomically.
    pub fn emit(&self, bytes: &[u8]) -> Result<()> {
        match &self.output {
            Some(path) => {
                AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
                    .write(|f| {
                        f.write_all(bytes)?;
                        f.flush()
                    })
                    .map_err(|err| anyhow!("Failed to write {}: {err}", path.display()))?;
                log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(bytes)?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Parse a group netlist file, collecting parser warnings into `diagnostics`.
pub fn read_netlist(path: &Path, diagnostics: &mut Diagnostics) -> Result<Netlist> {
    let parsed = netgroup_xml::parse_netlist(&read_text(path)?)
        .with_context(|| format!("Failed to parse group netlist {}", path.display()))?;
    Ok(parsed.unpack_into(diagnostics))
}

pub fn read_map(path: &Path, diagnostics: &mut Diagnostics) -> Result<GroupMap> {
    let parsed = netgroup_xml::parse_map(&read_text(path)?)
        .with_context(|| format!("Failed to parse group map {}", path.display()))?;
    Ok(parsed.unpack_into(diagnostics))
}

/// Print warnings to standard error.
pub fn report(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("{} {}", "Warning:".yellow(), diagnostic.body);
    }
}

/// Local time at microsecond precision, as recorded in generated documents.
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}
