//! Config Migrate
//!
//! Command-line front end for applying and authoring configuration migrations.

use anyhow::Result;
use clap::Parser;
use config_migrate::cli::{Cli, Command, generate, migrate, operation, render_error};
use config_migrate::logging::{LogTarget, init_logging};
use config_migrate::migration::Operation;
use tracing::debug;

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("{}", render_error(&err));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Initialize logging based on --log option
    init_logging(&LogTarget::parse(&cli.log), cli.verbose)?;
    debug!(command = ?cli.command, "Starting");

    // Handle subcommands
    match cli.command {
        Command::Migrate(args) => {
            migrate::run_migrate(&args)?;
        }
        Command::Generate(args) => {
            generate::run_generate(&args)?;
        }
        Command::Add(args) => {
            operation::run_operation(Operation::Add, &args)?;
        }
        Command::Remove(args) => {
            operation::run_remove(&args)?;
        }
        Command::Modify(args) => {
            operation::run_operation(Operation::Modify, &args)?;
        }
    }

    Ok(())
}
