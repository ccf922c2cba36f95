mod cli;
mod commands;
mod logger;

use cli::{Cli, Commands};

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    logger::init(cli.verbose)?;
    match &cli.command {
        Commands::Run(args) => commands::run::run(&cli, args),
        Commands::Hexgrid(args) => commands::hexgrid::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
