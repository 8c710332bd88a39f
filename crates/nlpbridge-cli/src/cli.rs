//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Args, Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use nlpbridge_core::Backend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// nlpbridge - Linguistic annotations from the command line
///
/// Tokenizes, tags and analyzes text through the annotation engine. Text is
/// read from the argument, from --file, or from standard input.
#[derive(Parser, Debug)]
#[command(
    name = "nlpbridge",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "NLPBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results [default: human]
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Engine backend to use
    #[arg(long, value_enum, global = true)]
    pub engine: Option<EngineKind>,

    /// Path to the engine shared library
    #[arg(long, global = true, value_name = "PATH")]
    pub engine_lib: Option<PathBuf>,

    /// Model to load into the engine
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Give up on an operation after this many seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split text into tokens with their annotations
    Tokenize(TextArgs),

    /// Extract named entities with character offsets
    Entities(TextArgs),

    /// Split text into sentences
    Sentences(TextArgs),

    /// Part-of-speech tag per token
    Pos(TextArgs),

    /// Dependency label per token
    Deps(TextArgs),

    /// Lemma per token
    Lemmas(TextArgs),

    /// Tokens, entities and sentences in one report
    Analyze(TextArgs),

    /// Initialize the engine and run a probe sentence through it
    Check(CheckArgs),

    /// Manage configuration files and settings
    Config(ConfigArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

impl Commands {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Tokenize(_) => "tokenize",
            Commands::Entities(_) => "entities",
            Commands::Sentences(_) => "sentences",
            Commands::Pos(_) => "pos",
            Commands::Deps(_) => "deps",
            Commands::Lemmas(_) => "lemmas",
            Commands::Analyze(_) => "analyze",
            Commands::Check(_) => "check",
            Commands::Config(_) => "config",
            Commands::Completions(_) => "completions",
        }
    }
}

/// Where to read the input text from
#[derive(Args, Debug, Clone, Default)]
pub struct TextArgs {
    /// Text to annotate (reads standard input when neither TEXT nor --file is given)
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,

    /// Read the text from a file
    #[arg(short, long, value_name = "PATH", conflicts_with = "text")]
    pub file: Option<PathBuf>,
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Sentence to run through the engine
    #[arg(long, default_value = "The quick brown fox jumps over the lazy dog.")]
    pub probe: String,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show(ConfigShowArgs),

    /// Write a configuration file with default values
    Init(ConfigInitArgs),
}

/// Arguments for config show
#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Show configuration in specified format
    #[arg(short, long, value_enum, default_value = "toml")]
    pub format: ConfigFormat,
}

/// Arguments for config init
#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Where to write the file; the format follows the extension
    #[arg(value_name = "PATH", default_value = "nlpbridge.toml")]
    pub path: PathBuf,

    /// Force overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for generating shell completions
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Human-readable formatted output
    #[default]
    Human,
    /// JSON output
    Json,
    /// Pretty-printed JSON output
    JsonPretty,
    /// YAML output
    Yaml,
}

/// Configuration file formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Engine backends selectable from the command line
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// Built-in rule-based engine
    Stub,
    /// Engine shared library (see --engine-lib)
    Library,
}

impl From<EngineKind> for Backend {
    fn from(kind: EngineKind) -> Self {
        match kind {
            EngineKind::Stub => Backend::Stub,
            EngineKind::Library => Backend::Library,
        }
    }
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}

/// Engine settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct EngineOverrides {
    pub engine: Option<EngineKind>,
    pub engine_lib: Option<PathBuf>,
    pub model: Option<String>,
    pub timeout: Option<u64>,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }

    /// Engine flags, to be layered over file and environment settings
    pub fn engine_overrides(&self) -> EngineOverrides {
        EngineOverrides {
            engine: self.engine,
            engine_lib: self.engine_lib.clone(),
            model: self.model.clone(),
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_level() {
        let cli = Cli::parse_from(["nlpbridge", "-vv", "tokenize", "hello"]);
        assert_eq!(cli.verbosity_level(), 2);

        let cli = Cli::parse_from(["nlpbridge", "--quiet", "tokenize", "hello"]);
        assert_eq!(cli.verbosity_level(), 0);
    }

    #[test]
    fn test_engine_flags() {
        let cli = Cli::parse_from([
            "nlpbridge",
            "pos",
            "--engine",
            "stub",
            "--model",
            "en_core_web_lg",
            "--timeout",
            "5",
            "a a b",
        ]);
        let overrides = cli.engine_overrides();
        assert_eq!(overrides.engine, Some(EngineKind::Stub));
        assert_eq!(overrides.model.as_deref(), Some("en_core_web_lg"));
        assert_eq!(overrides.timeout, Some(5));
        match cli.command {
            Commands::Pos(args) => assert_eq!(args.text.as_deref(), Some("a a b")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_text_and_file_conflict() {
        let result = Cli::try_parse_from(["nlpbridge", "tokenize", "hello", "--file", "in.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_output_format_names() {
        let cli = Cli::parse_from(["nlpbridge", "-o", "json-pretty", "sentences", "x"]);
        assert_eq!(cli.output, Some(OutputFormat::JsonPretty));
        assert_eq!(EngineKind::Library.to_possible_value().unwrap().get_name(), "library");
    }
}
