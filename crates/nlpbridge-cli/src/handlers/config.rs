//! Configuration command handlers

use super::utils::EngineSettings;
use crate::cli::{ConfigAction, ConfigArgs, ConfigFormat, ConfigInitArgs, ConfigShowArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;

/// Handle the config command
pub async fn handle_config(
    args: ConfigArgs,
    config: &Config,
    settings: &EngineSettings,
    output: &mut OutputWriter,
) -> Result<()> {
    match args.action {
        ConfigAction::Show(show_args) => handle_config_show(show_args, config, settings, output).await,
        ConfigAction::Init(init_args) => handle_config_init(init_args, output).await,
    }
}

/// Handle config show subcommand
///
/// Prints the configuration with environment and flag overrides applied.
async fn handle_config_show(
    args: ConfigShowArgs,
    config: &Config,
    settings: &EngineSettings,
    output: &mut OutputWriter,
) -> Result<()> {
    let mut effective = config.clone();
    effective.engine = settings.engine.clone();
    if let Some(timeout) = settings.timeout {
        effective.output.timeout = Some(timeout.as_secs());
    }

    let content = match args.format {
        ConfigFormat::Toml => toml::to_string_pretty(&effective)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&effective)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&effective)?,
    };

    output.emit(&content)
}

/// Handle config init subcommand
async fn handle_config_init(args: ConfigInitArgs, output: &mut OutputWriter) -> Result<()> {
    if args.path.exists() && !args.force {
        return Err(Error::config(format!(
            "{} already exists (use --force to overwrite)",
            args.path.display()
        )));
    }
    if args.path.exists() {
        output.warning(&format!("Overwriting {}", args.path.display()))?;
    }

    Config::default().save(&args.path)?;
    output.success(&format!("✓ Created config at {}", args.path.display()))?;
    output.info("Edit it to choose the engine library and model.")?;
    Ok(())
}
