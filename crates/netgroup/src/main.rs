use clap::{Parser, Subcommand};
use colored::Colorize;
use env_logger::Env;

mod codegen;
mod files;
mod many_to_many;
mod map_to_csv;
mod merge;
mod netlist;
mod netlist_to_csv;
mod one_to_many;

#[derive(Parser)]
#[command(name = "netgroup")]
#[command(about = "Group netlists, connectivity maps and code generation", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true, hide = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a group netlist from a KiCad XML netlist export
    Netlist(netlist::NetlistArgs),

    /// Merge group netlists of several schematics, optionally joining connectors
    Merge(merge::MergeArgs),

    /// Map every group's pins onto the pins of one root group
    OneToMany(one_to_many::OneToManyArgs),

    /// Map every group pin to the pins it shares a net with
    ManyToMany(many_to_many::ManyToManyArgs),

    /// Convert a many-to-many map to CSV
    MapToCsv(map_to_csv::MapToCsvArgs),

    /// Convert a group netlist straight to many-to-many CSV
    NetlistToCsv(netlist_to_csv::NetlistToCsvArgs),

    /// Render a template against a group netlist
    #[command(alias = "code-gen")]
    Codegen(codegen::CodegenArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "Error:".red());
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Default level depends on --debug, RUST_LOG overrides both
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("error")
    };
    env_logger::Builder::from_env(env).init();

    match cli.command {
        Commands::Netlist(args) => netlist::execute(args),
        Commands::Merge(args) => merge::execute(args),
        Commands::OneToMany(args) => one_to_many::execute(args),
        Commands::ManyToMany(args) => many_to_many::execute(args),
        Commands::MapToCsv(args) => map_to_csv::execute(args),
        Commands::NetlistToCsv(args) => netlist_to_csv::execute(args),
        Commands::Codegen(args) => codegen::execute(args),
    }
}
