use anyhow::Result;
use clap::Parser;

use bezirk::cli::{Cli, Commands};
use bezirk::commands::{fetch, realloc, render, stats};

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Fetch(args) => fetch::run(&cli, args),
        Commands::Realloc(args) => realloc::run(&cli, args),
        Commands::Render(args) => render::run(&cli, args),
        Commands::Stats(args) => stats::run(&cli, args),
    }
}
