//! Check command handler
//!
//! Loads the configured engine and pushes a probe sentence through every
//! operation, reporting what came back.

use super::utils::{open_engine, run_engine, EngineSettings};
use crate::cli::CheckArgs;
use crate::error::Result;
use crate::logging::{current_session_id, timing::Timer};
use crate::output::{HealthReport, OutputWriter};

/// Handle the check command
pub async fn handle_check(args: CheckArgs, settings: &EngineSettings, output: &mut OutputWriter) -> Result<()> {
    output.info(&format!(
        "Checking engine ({}, model {})",
        settings.engine.backend, settings.engine.model
    ))?;

    let timer = Timer::new("check");
    let nlp = open_engine(settings, output).await?;

    let probe = args.probe;
    let (tokens, entities, sentences) = run_engine(&nlp, settings.timeout, move |nlp| {
        Ok((
            nlp.tokenize(&probe)?.len(),
            nlp.extract_entities(&probe)?.len(),
            nlp.split_sentences(&probe)?.len(),
        ))
    })
    .await?;

    let report = HealthReport {
        status: "healthy".to_string(),
        model: nlp.model().to_string(),
        engine: nlp.origin().to_string(),
        version: nlpbridge_core::VERSION.to_string(),
        probe_tokens: tokens,
        probe_entities: entities,
        probe_sentences: sentences,
        elapsed_ms: timer.elapsed().as_millis() as u64,
        session_id: current_session_id().map(str::to_string),
    };

    nlp.close();
    output.health(&report)?;
    output.success("✓ Engine is healthy")?;
    Ok(())
}
