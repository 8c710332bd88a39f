//! Command handlers for CLI subcommands
//!
//! This module contains the implementation logic for each CLI subcommand.

mod analyze;
mod annotate;
mod check;
mod completions;
mod config;
mod utils;

pub use analyze::handle_analyze;
pub use annotate::{handle_entities, handle_map, handle_sentences, handle_tokenize, MapKind};
pub use check::handle_check;
pub use completions::handle_completions;
pub use config::handle_config;
pub use utils::EngineSettings;
