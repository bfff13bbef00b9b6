//! Mapcheck Command-Line Client
//!
//! Validates the schema mapping of a database file and runs integrity checks
//! against its data.

mod args;
mod commands;
mod formatter;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use args::{Args, Command};

fn main() {
    // Logs go to stderr so JSON output stays parseable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mapcheck=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> commands::CommandResult {
    let formatter = formatter::create_formatter(args.format);

    match args.command {
        Command::Validate { file } => commands::validate(&file, &*formatter),
        Command::Check {
            check,
            file,
            limit,
            integrity,
        } => commands::check(&file, check, integrity.into_config(), limit, &*formatter),
        Command::QuickCheck {
            file,
            checks,
            integrity,
        } => commands::quick_check(&file, &checks, integrity.into_config(), &*formatter),
    }
}
