//! Annotation facade
//!
//! [`Nlp`] wraps an [`EngineHandle`] and exposes each engine operation as a
//! safe method returning owned values.

use std::collections::HashMap;

use tracing::instrument;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::ffi::{self, EngineBinding, EngineOrigin};
use crate::handle::{EngineHandle, HandleState};
use crate::stub;
use crate::types::{Analysis, Entity, Token};

/// Safe entry point to the annotation engine
///
/// At most one `Nlp` can be live per process. Operations on a shared `Nlp`
/// are serialized; wrap it in an `Arc` to use it from several threads.
#[derive(Debug)]
pub struct Nlp {
    handle: EngineHandle,
}

impl Nlp {
    /// Initialize the engine behind `binding` with `model`
    pub fn new(binding: EngineBinding, model: &str) -> Result<Self> {
        Ok(Self {
            handle: EngineHandle::initialize(binding, model)?,
        })
    }

    /// Initialize the engine selected by `config`
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let binding = config.open_binding()?;
        Self::new(binding, &config.model)
    }

    /// Initialize the in-process stub engine with `model`
    pub fn stub(model: &str) -> Result<Self> {
        Self::new(stub::binding(), model)
    }

    pub fn model(&self) -> &str {
        self.handle.model()
    }

    pub fn origin(&self) -> &EngineOrigin {
        self.handle.origin()
    }

    pub fn state(&self) -> HandleState {
        self.handle.state()
    }

    /// Finalize the engine; see [`EngineHandle::close`]
    pub fn close(&self) -> bool {
        self.handle.close()
    }

    /// Split `text` into annotated tokens, in source order
    #[instrument(skip(self, text), fields(model = %self.model(), bytes = text.len()))]
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        // SAFETY: `with_ready` holds the handle lock and only runs while the
        // engine is initialized.
        self.handle.with_ready(|api| unsafe { ffi::tokenize(api, text) })
    }

    /// Named entities in `text` with character offsets
    #[instrument(skip(self, text), fields(model = %self.model(), bytes = text.len()))]
    pub fn extract_entities(&self, text: &str) -> Result<Vec<Entity>> {
        // SAFETY: as in `tokenize`.
        self.handle.with_ready(|api| unsafe { ffi::extract_entities(api, text) })
    }

    /// Sentences of `text`, in source order
    #[instrument(skip(self, text), fields(model = %self.model(), bytes = text.len()))]
    pub fn split_sentences(&self, text: &str) -> Result<Vec<String>> {
        // SAFETY: as in `tokenize`.
        self.handle.with_ready(|api| unsafe { ffi::split_sentences(api, text) })
    }

    /// Part-of-speech tag per token text
    ///
    /// Repeated surface forms collapse into one key holding the value of
    /// their last occurrence.
    pub fn pos_tags(&self, text: &str) -> Result<HashMap<String, String>> {
        Ok(project(self.tokenize(text)?, |t| t.pos))
    }

    /// Dependency label per token text, last occurrence wins
    pub fn dependencies(&self, text: &str) -> Result<HashMap<String, String>> {
        Ok(project(self.tokenize(text)?, |t| t.dep))
    }

    /// Lemma per token text, last occurrence wins
    pub fn lemmas(&self, text: &str) -> Result<HashMap<String, String>> {
        Ok(project(self.tokenize(text)?, |t| t.lemma))
    }

    /// Tokens, entities and sentences of `text` with their counts
    #[instrument(skip(self, text), fields(model = %self.model(), bytes = text.len()))]
    pub fn analyze(&self, text: &str) -> Result<Analysis> {
        let tokens = self.tokenize(text)?;
        let entities = self.extract_entities(text)?;
        let sentences = self.split_sentences(text)?;
        Ok(Analysis::new(tokens, entities, sentences))
    }
}

fn project(tokens: Vec<Token>, field: impl Fn(Token) -> String) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(tokens.len());
    for token in tokens {
        let key = token.text.clone();
        map.insert(key, field(token));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serial_test::serial;

    fn token(text: &str, pos: &str) -> Token {
        Token {
            text: text.to_string(),
            lemma: text.to_lowercase(),
            pos: pos.to_string(),
            tag: String::new(),
            dep: String::new(),
            is_stop: false,
            is_punct: false,
        }
    }

    #[test]
    fn test_project_last_wins() {
        let tokens = vec![token("a", "DET"), token("a", "NOUN"), token("b", "VERB")];
        let map = project(tokens, |t| t.pos);
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], "NOUN");
        assert_eq!(map["b"], "VERB");
    }

    #[test]
    fn test_project_empty() {
        assert!(project(Vec::new(), |t| t.lemma).is_empty());
    }

    #[test]
    #[serial]
    fn test_operations_fail_after_close() {
        let nlp = Nlp::stub("en_core_web_sm").unwrap();
        assert_eq!(nlp.tokenize("Hello").unwrap().len(), 1);
        assert!(nlp.close());

        assert!(matches!(nlp.tokenize("Hello"), Err(Error::NotReady { .. })));
        assert!(matches!(nlp.lemmas("Hello"), Err(Error::NotReady { .. })));
        assert!(matches!(nlp.analyze("Hello"), Err(Error::NotReady { .. })));
    }
}
