//! Single-annotation command handlers

use super::utils::{open_engine, read_input, run_engine, EngineSettings};
use crate::cli::TextArgs;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use std::collections::HashMap;
use tracing::info;

/// Which per-token value a map command reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    Pos,
    Deps,
    Lemmas,
}

impl MapKind {
    fn title(self) -> &'static str {
        match self {
            MapKind::Pos => "POS",
            MapKind::Deps => "DEP",
            MapKind::Lemmas => "LEMMA",
        }
    }
}

/// Handle the tokenize command
pub async fn handle_tokenize(args: TextArgs, settings: &EngineSettings, output: &mut OutputWriter) -> Result<()> {
    let text = read_input(&args)?;
    let nlp = open_engine(settings, output).await?;

    let tokens = {
        let _timer = Timer::with_details("tokenize", nlp.model());
        run_engine(&nlp, settings.timeout, move |nlp| nlp.tokenize(&text)).await?
    };

    info!(count = tokens.len(), "Tokenized input");
    output.tokens(&tokens)?;
    nlp.close();
    Ok(())
}

/// Handle the entities command
pub async fn handle_entities(args: TextArgs, settings: &EngineSettings, output: &mut OutputWriter) -> Result<()> {
    let text = read_input(&args)?;
    let nlp = open_engine(settings, output).await?;

    let entities = {
        let _timer = Timer::with_details("extract_entities", nlp.model());
        run_engine(&nlp, settings.timeout, move |nlp| nlp.extract_entities(&text)).await?
    };

    info!(count = entities.len(), "Extracted entities");
    output.entities(&entities)?;
    nlp.close();
    Ok(())
}

/// Handle the sentences command
pub async fn handle_sentences(args: TextArgs, settings: &EngineSettings, output: &mut OutputWriter) -> Result<()> {
    let text = read_input(&args)?;
    let nlp = open_engine(settings, output).await?;

    let sentences = {
        let _timer = Timer::with_details("split_sentences", nlp.model());
        run_engine(&nlp, settings.timeout, move |nlp| nlp.split_sentences(&text)).await?
    };

    info!(count = sentences.len(), "Split sentences");
    output.sentences(&sentences)?;
    nlp.close();
    Ok(())
}

/// Handle the pos, deps and lemmas commands
pub async fn handle_map(
    kind: MapKind,
    args: TextArgs,
    settings: &EngineSettings,
    output: &mut OutputWriter,
) -> Result<()> {
    let text = read_input(&args)?;
    let nlp = open_engine(settings, output).await?;

    let map: HashMap<String, String> = {
        let _timer = Timer::with_details("token_map", kind.title());
        run_engine(&nlp, settings.timeout, move |nlp| match kind {
            MapKind::Pos => nlp.pos_tags(&text),
            MapKind::Deps => nlp.dependencies(&text),
            MapKind::Lemmas => nlp.lemmas(&text),
        })
        .await?
    };

    info!(kind = ?kind, keys = map.len(), "Built token map");
    output.map(kind.title(), &map)?;
    nlp.close();
    Ok(())
}
