//! Owned annotation records returned to callers
//!
//! Nothing in this module points into foreign memory. Values are built by
//! the record converter from decoded copies and outlive the foreign call
//! that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single token with its linguistic attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Surface form
    pub text: String,
    /// Canonical form
    pub lemma: String,
    /// Coarse part-of-speech
    pub pos: String,
    /// Fine-grained tag
    pub tag: String,
    /// Dependency relation label
    pub dep: String,
    /// Whether the token is a stop word
    pub is_stop: bool,
    /// Whether the token is punctuation
    pub is_punct: bool,
}

/// A named entity span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity surface span
    pub text: String,
    /// Entity type
    pub label: String,
    /// Character offset of the first character
    pub start: usize,
    /// Character offset one past the last character
    pub end: usize,
}

impl Entity {
    /// Number of characters covered by the span
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }

    /// Slice the span out of the source text by character offsets
    pub fn span_in<'a>(&self, source: &'a str) -> Option<&'a str> {
        let mut indices = source
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(source.len()));
        let begin = indices.nth(self.start)?;
        let finish = if self.end == self.start {
            begin
        } else {
            indices.nth(self.end - self.start - 1)?
        };
        source.get(begin..finish)
    }
}

/// Combined result of every annotation over one text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub tokens: Vec<Token>,
    pub entities: Vec<Entity>,
    pub sentences: Vec<String>,
    pub token_count: usize,
    pub entity_count: usize,
    pub sentence_count: usize,
    pub processed_at: DateTime<Utc>,
}

impl Analysis {
    /// Assemble an analysis, deriving the counts
    pub fn new(tokens: Vec<Token>, entities: Vec<Entity>, sentences: Vec<String>) -> Self {
        Self {
            token_count: tokens.len(),
            entity_count: entities.len(),
            sentence_count: sentences.len(),
            tokens,
            entities,
            sentences,
            processed_at: Utc::now(),
        }
    }
}
