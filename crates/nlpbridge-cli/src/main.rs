//! nlpbridge CLI - Linguistic annotations from the command line
//!
//! This is the main entry point for the nlpbridge CLI application, providing
//! commands for tokenizing, tagging and analyzing text through the
//! annotation engine.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::{Error, Result};
use handlers::{EngineSettings, MapKind};
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::instrument;
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Set up colored output
    control::set_override(cli.use_color());

    // The config file may carry logging settings, so it is read first
    let config = match Config::load_with_file(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(e),
    };

    let guard = match init_logging(&cli, &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    let result = run(cli, config).await;

    // process::exit skips destructors; flush the log file first
    drop(guard);

    match result {
        Ok(()) => process::exit(0),
        Err(e) => exit_with(e),
    }
}

fn exit_with(e: Error) -> ! {
    eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));

    if e.should_show_help() {
        eprintln!("\nFor more information, try '--help'");
    }

    process::exit(e.exit_code());
}

/// Main application logic
#[instrument(skip_all, fields(command = cli.command.name()))]
async fn run(cli: Cli, config: Config) -> Result<()> {
    let _timer = Timer::new("cli_execution");

    let settings = EngineSettings::resolve(&config, &cli.engine_overrides())?;

    // Create output writer
    let format = cli.output.unwrap_or(config.output.format);
    let mut output = OutputWriter::new(format, cli.use_color(), cli.quiet, config.output.progress);

    tracing::info!(
        command = cli.command.name(),
        backend = %settings.engine.backend,
        model = %settings.engine.model,
        verbosity = cli.verbosity_level(),
        "Executing command"
    );

    // Handle the subcommand
    match cli.command {
        Commands::Tokenize(args) => handlers::handle_tokenize(args, &settings, &mut output).await,
        Commands::Entities(args) => handlers::handle_entities(args, &settings, &mut output).await,
        Commands::Sentences(args) => handlers::handle_sentences(args, &settings, &mut output).await,
        Commands::Pos(args) => handlers::handle_map(MapKind::Pos, args, &settings, &mut output).await,
        Commands::Deps(args) => handlers::handle_map(MapKind::Deps, args, &settings, &mut output).await,
        Commands::Lemmas(args) => handlers::handle_map(MapKind::Lemmas, args, &settings, &mut output).await,
        Commands::Analyze(args) => handlers::handle_analyze(args, &settings, &mut output).await,
        Commands::Check(args) => handlers::handle_check(args, &settings, &mut output).await,
        Commands::Config(args) => handlers::handle_config(args, &config, &settings, &mut output).await,
        Commands::Completions(args) => handlers::handle_completions(args, &mut output),
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli, config: &Config) -> Result<Option<WorkerGuard>> {
    let mut logging_config = LoggingConfig::from_verbosity(cli.verbosity_level());

    // File settings first, then environment overrides
    logging_config.merge_with_file(&config.logging);
    logging_config.merge_with_env();

    // If quiet mode, only log errors
    if cli.quiet {
        logging_config.level = "error".to_string();
        logging_config.console = false;
    }

    logging::init_logging(logging_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["nlpbridge", "tokenize", "Hello world."]);
        assert_eq!(cli.verbosity_level(), 0);
        assert_eq!(cli.command.name(), "tokenize");

        let cli = Cli::parse_from(["nlpbridge", "-vv", "lemmas", "--file", "input.txt"]);
        assert_eq!(cli.verbosity_level(), 2);
        assert_eq!(cli.command.name(), "lemmas");

        let cli = Cli::parse_from(["nlpbridge", "--quiet", "check"]);
        assert_eq!(cli.verbosity_level(), 0);
        assert!(cli.quiet);
    }
}
