//! Analyze command handler

use super::utils::{open_engine, read_input, run_engine, EngineSettings};
use crate::cli::TextArgs;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;

/// Handle the analyze command
pub async fn handle_analyze(args: TextArgs, settings: &EngineSettings, output: &mut OutputWriter) -> Result<()> {
    let text = read_input(&args)?;
    let nlp = open_engine(settings, output).await?;

    let analysis = {
        let _timer = Timer::with_details("analyze", nlp.model());
        run_engine(&nlp, settings.timeout, move |nlp| nlp.analyze(&text)).await?
    };

    tracing::info!(
        tokens = analysis.token_count,
        entities = analysis.entity_count,
        sentences = analysis.sentence_count,
        "Analysis complete"
    );
    output.analysis(&analysis)?;
    nlp.close();
    Ok(())
}
