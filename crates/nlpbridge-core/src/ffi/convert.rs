//! Conversion of foreign record blocks into owned collections
//!
//! Every function here reads the block eagerly and returns values that own
//! their storage, so the descriptor can be released as soon as they return.

use std::os::raw::c_char;

use super::marshal::decode;
use super::records::{records, EntityArray, EntityRecord, ForeignArray, SentenceArray, TokenArray, TokenRecord};
use crate::error::{Error, Result};
use crate::types::{Entity, Token};

/// Decode a token descriptor
///
/// # Safety
/// `array` must be a live descriptor returned by the engine's tokenize call.
pub unsafe fn convert_tokens(array: &TokenArray) -> Result<Vec<Token>> {
    let block = block_of(array)?;
    let mut tokens = Vec::with_capacity(block.len());
    for record in block {
        tokens.push(convert_token(record)?);
    }
    Ok(tokens)
}

/// Decode an entity descriptor
///
/// # Safety
/// `array` must be a live descriptor returned by the engine's entity call.
pub unsafe fn convert_entities(array: &EntityArray) -> Result<Vec<Entity>> {
    let block = block_of(array)?;
    let mut entities = Vec::with_capacity(block.len());
    for record in block {
        entities.push(convert_entity(record)?);
    }
    Ok(entities)
}

/// Decode a sentence descriptor
///
/// # Safety
/// `array` must be a live descriptor returned by the engine's sentence call.
pub unsafe fn convert_strings(array: &SentenceArray) -> Result<Vec<String>> {
    let block = block_of(array)?;
    let mut sentences = Vec::with_capacity(block.len());
    for (index, &sentence) in block.iter().enumerate() {
        sentences.push(decode(
            sentence as *const c_char,
            SentenceArray::CALL,
            &format!("sentences[{}]", index),
        )?);
    }
    Ok(sentences)
}

unsafe fn block_of<A: ForeignArray>(array: &A) -> Result<&[A::Record]> {
    records(array).ok_or_else(|| {
        Error::foreign_call(
            A::CALL,
            format!("descriptor reports {} records but the block is null", array.count()),
        )
    })
}

unsafe fn convert_token(record: &TokenRecord) -> Result<Token> {
    const CALL: &str = TokenArray::CALL;
    Ok(Token {
        text: decode(record.text, CALL, "text")?,
        lemma: decode(record.lemma, CALL, "lemma")?,
        pos: decode(record.pos, CALL, "pos")?,
        tag: decode(record.tag, CALL, "tag")?,
        dep: decode(record.dep, CALL, "dep")?,
        is_stop: record.is_stop,
        is_punct: record.is_punct,
    })
}

unsafe fn convert_entity(record: &EntityRecord) -> Result<Entity> {
    const CALL: &str = EntityArray::CALL;
    let text = decode(record.text, CALL, "text")?;
    let label = decode(record.label, CALL, "label")?;

    let (start, end) = match (usize::try_from(record.start), usize::try_from(record.end)) {
        (Ok(start), Ok(end)) if start < end => (start, end),
        _ => {
            return Err(Error::foreign_call(
                CALL,
                format!(
                    "entity '{}' has invalid span [{}, {})",
                    text, record.start, record.end
                ),
            ))
        }
    };

    Ok(Entity {
        text,
        label,
        start,
        end,
    })
}
