//! Shared utilities for command handlers

use crate::cli::{EngineOverrides, TextArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use nlpbridge_core::{EngineConfig, Nlp};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Engine settings after layering file, environment and flags
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub engine: EngineConfig,
    pub timeout: Option<Duration>,
}

impl EngineSettings {
    /// Resolve the effective engine settings
    pub fn resolve(config: &Config, overrides: &EngineOverrides) -> Result<Self> {
        let mut engine = config.engine.clone();
        engine.merge_env()?;

        if let Some(kind) = overrides.engine {
            engine.backend = kind.into();
        }
        if let Some(path) = &overrides.engine_lib {
            engine.library = Some(path.clone());
        }
        if let Some(model) = &overrides.model {
            engine.model = model.clone();
        }

        let timeout = overrides
            .timeout
            .or(config.output.timeout)
            .map(Duration::from_secs);

        debug!(?engine, ?timeout, "Resolved engine settings");
        Ok(Self { engine, timeout })
    }
}

/// Read the input text from the argument, a file, or standard input
pub fn read_input(args: &TextArgs) -> Result<String> {
    let text = match (&args.text, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => {
            if !path.exists() {
                return Err(Error::FileNotFound { path: path.clone() });
            }
            std::fs::read_to_string(path)?
        }
        (None, None) => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    require_text(text)
}

fn require_text(text: String) -> Result<String> {
    if text.trim().is_empty() {
        return Err(Error::invalid_args(
            "text is required (pass it as an argument, with --file, or on standard input)",
        ));
    }
    Ok(text)
}

/// Initialize the engine, showing a spinner while the model loads
pub async fn open_engine(settings: &EngineSettings, output: &OutputWriter) -> Result<Arc<Nlp>> {
    let spinner = output.spinner(&format!("Loading model {}", settings.engine.model));
    let engine = settings.engine.clone();

    let opened = tokio::task::spawn_blocking(move || Nlp::from_config(&engine))
        .await
        .map_err(|e| Error::other(format!("Engine startup task failed: {}", e)))?;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let nlp = opened?;
    info!(model = nlp.model(), engine = %nlp.origin(), "Engine ready");
    Ok(Arc::new(nlp))
}

/// Run an engine operation on the blocking pool, bounded by the timeout
///
/// On timeout the operation keeps running on its worker; only its result is
/// abandoned.
pub async fn run_engine<T, F>(nlp: &Arc<Nlp>, timeout: Option<Duration>, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Nlp) -> nlpbridge_core::Result<T> + Send + 'static,
{
    let worker = Arc::clone(nlp);
    let task = tokio::task::spawn_blocking(move || op(&worker));

    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| Error::Timeout {
                seconds: limit.as_secs(),
            })?,
        None => task.await,
    };

    let result = joined.map_err(|e| Error::other(format!("Engine task failed: {}", e)))?;
    Ok(result?)
}
