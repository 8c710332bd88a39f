//! The foreign boundary
//!
//! Everything `unsafe` in the crate lives under this module:
//!
//! - `records`: `#[repr(C)]` records and array descriptors
//! - `engine`: the engine function table and how it is obtained
//! - `marshal`: text in and out of foreign buffers
//! - `convert`: record blocks into owned collections
//! - `release`: scoped hand-back of descriptors to the engine
//!
//! An operation always runs in the same order: encode the argument, make the
//! call, wrap the descriptor in a [`ReleaseGuard`], convert, release.

pub mod convert;
pub mod engine;
pub mod marshal;
pub mod records;
pub mod release;

pub use convert::{convert_entities, convert_strings, convert_tokens};
pub use engine::{EngineApi, EngineBinding, EngineOrigin};
pub use marshal::{decode, encode, ForeignBuffer};
pub use records::{EntityArray, EntityRecord, ForeignArray, SentenceArray, TokenArray, TokenRecord};
pub use release::ReleaseGuard;

use crate::error::{Error, Result};
use crate::types::{Entity, Token};
use tracing::debug;

/// Tokenize `text` through the engine
///
/// # Safety
/// `api` must belong to an engine that has been initialized and not yet
/// cleaned up, and no other call may run on it concurrently.
pub unsafe fn tokenize(api: &EngineApi, text: &str) -> Result<Vec<Token>> {
    let buffer = encode(text)?;
    let guard = ReleaseGuard::new(api, (api.tokenize)(buffer.as_ptr()));
    let tokens = convert_tokens(guard.array())?;
    guard.release();
    debug!(call = TokenArray::CALL, records = tokens.len(), "Foreign call completed");
    Ok(tokens)
}

/// Extract entities from `text` through the engine
///
/// Spans are checked against the character length of `text`.
///
/// # Safety
/// Same contract as [`tokenize`].
pub unsafe fn extract_entities(api: &EngineApi, text: &str) -> Result<Vec<Entity>> {
    let buffer = encode(text)?;
    let guard = ReleaseGuard::new(api, (api.extract_entities)(buffer.as_ptr()));
    let entities = convert_entities(guard.array())?;
    guard.release();

    let char_len = text.chars().count();
    if let Some(entity) = entities.iter().find(|e| e.end > char_len) {
        return Err(Error::foreign_call(
            EntityArray::CALL,
            format!(
                "entity '{}' ends at {} past the text length {}",
                entity.text, entity.end, char_len
            ),
        ));
    }

    debug!(call = EntityArray::CALL, records = entities.len(), "Foreign call completed");
    Ok(entities)
}

/// Split `text` into sentences through the engine
///
/// # Safety
/// Same contract as [`tokenize`].
pub unsafe fn split_sentences(api: &EngineApi, text: &str) -> Result<Vec<String>> {
    let buffer = encode(text)?;
    let guard = ReleaseGuard::new(api, (api.split_sentences)(buffer.as_ptr()));
    let sentences = convert_strings(guard.array())?;
    guard.release();
    debug!(call = SentenceArray::CALL, records = sentences.len(), "Foreign call completed");
    Ok(sentences)
}
