//! depforge CLI - builds third-party dependencies for a target platform

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("depforge=debug")
    } else {
        EnvFilter::new("depforge=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Build(args) => commands::build::execute(args),
        Commands::Platforms(args) => commands::platforms::execute(args),
        Commands::Install(args) => commands::install::execute(args),
        Commands::Doctor => commands::doctor::execute(cli.verbose),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
