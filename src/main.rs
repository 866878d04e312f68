//! Factmine CLI entry point.

use clap::Parser;
use factmine::cli::{self, Cli, Commands, EXIT_ERROR};

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Imports(args) => cli::run_imports(args),
        Commands::Dependencies(args) => cli::run_dependencies(args),
        Commands::Plugins(args) => cli::run_plugins(args),
        Commands::Properties(args) => cli::run_properties(args),
        Commands::Modules(args) => cli::run_modules(args),
        Commands::Metrics(args) => cli::run_metrics(args),
        Commands::Tag(args) => cli::run_tag(args),
        Commands::All(args) => cli::run_all(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
