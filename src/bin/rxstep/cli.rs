use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rxstep",
    about = "Reactive steps on top of molecular dynamics",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a reactive-step simulation
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Print an annotated example reaction template
    #[command(name = "example-reaction")]
    ExampleReaction,
}

#[derive(Args)]
pub struct RunArgs {
    /// Run configuration file (TOML)
    #[arg(short, long, value_name = "FILE", default_value = "rxstep.toml")]
    pub config: PathBuf,

    /// Override the configured RNG seed
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Suppress the progress display (for scripting)
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}
