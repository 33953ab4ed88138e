//! Apivet CLI - validate OpenAPI and Swagger documents
//!
//! This is the main entry point for the `apivet` binary: it parses arguments,
//! sets up logging and color, dispatches to a handler and turns the result
//! into the process exit code.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use error::Result;
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::instrument;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    control::set_override(cli.use_color());

    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));

            if e.should_show_help() {
                eprintln!("\nFor more information, try '--help'");
            }

            process::exit(e.exit_code());
        }
    }
}

/// Main application logic
#[instrument(skip(cli), fields(command = ?cli.command))]
async fn run(cli: Cli) -> Result<i32> {
    let _timer = Timer::new("cli_execution");

    let mut output = OutputWriter::new(cli.output, cli.use_color(), cli.quiet, cli.verbosity_level());
    let config_path = cli.config.as_deref();

    tracing::info!(
        verbosity = cli.verbosity_level(),
        run_id = logging::current_run_id().unwrap_or("unknown"),
        "Executing command"
    );

    match cli.command {
        Commands::Validate(args) => handlers::handle_validate(args, config_path, &mut output).await,
        Commands::Rules => handlers::handle_rules(config_path, &mut output).await,
        Commands::Config(args) => handlers::handle_config(args, config_path, &mut output).await,
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli) -> Result<()> {
    let mut logging_config = LoggingConfig::from_verbosity(cli.verbosity_level());
    logging_config.merge_with_env();

    if cli.quiet {
        logging_config.level = "error".to_string();
    }
    if cli.no_color {
        logging_config.ansi = false;
    }

    logging::init_logging(logging_config)
}
