//! FFI-safe record and descriptor layouts
//!
//! All types in this module mirror the engine's C header byte for byte and
//! are passed across the boundary by value with the C ABI.

use std::os::raw::{c_char, c_int};
use std::ptr;

use super::engine::EngineApi;

/// Token record as laid out by the engine
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TokenRecord {
    pub text: *const c_char,
    pub lemma: *const c_char,
    pub pos: *const c_char,
    pub tag: *const c_char,
    pub dep: *const c_char,
    pub is_stop: bool,
    pub is_punct: bool,
}

/// Entity record as laid out by the engine
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EntityRecord {
    pub text: *const c_char,
    pub label: *const c_char,
    pub start: c_int,
    pub end: c_int,
}

/// Descriptor for a block of token records
#[repr(C)]
#[derive(Debug)]
pub struct TokenArray {
    pub tokens: *mut TokenRecord,
    pub count: usize,
}

/// Descriptor for a block of entity records
#[repr(C)]
#[derive(Debug)]
pub struct EntityArray {
    pub entities: *mut EntityRecord,
    pub count: usize,
}

/// Descriptor for a block of sentence strings
#[repr(C)]
#[derive(Debug)]
pub struct SentenceArray {
    pub sentences: *mut *mut c_char,
    pub count: usize,
}

/// A foreign array descriptor populated by the engine
///
/// Implementors know which engine call produced them and which free
/// function gives the memory back.
pub trait ForeignArray {
    /// Fixed-layout record stored in the block
    type Record;

    /// Engine call that produces this descriptor, for diagnostics
    const CALL: &'static str;

    /// Pointer to the first record; only meaningful when `count() > 0`
    fn block(&self) -> *const Self::Record;

    /// Number of records in the block
    fn count(&self) -> usize;

    /// Hand the descriptor back to the engine's matching free function
    ///
    /// # Safety
    /// `self` must have been returned by the engine call named in `CALL`
    /// on the same engine `api`, and must not have been released before.
    unsafe fn release_with(&mut self, api: &EngineApi);
}

impl ForeignArray for TokenArray {
    type Record = TokenRecord;
    const CALL: &'static str = "spacy_tokenize";

    fn block(&self) -> *const TokenRecord {
        self.tokens
    }

    fn count(&self) -> usize {
        self.count
    }

    unsafe fn release_with(&mut self, api: &EngineApi) {
        (api.free_token_array)(self);
    }
}

impl ForeignArray for EntityArray {
    type Record = EntityRecord;
    const CALL: &'static str = "spacy_extract_entities";

    fn block(&self) -> *const EntityRecord {
        self.entities
    }

    fn count(&self) -> usize {
        self.count
    }

    unsafe fn release_with(&mut self, api: &EngineApi) {
        (api.free_entity_array)(self);
    }
}

impl ForeignArray for SentenceArray {
    type Record = *mut c_char;
    const CALL: &'static str = "spacy_split_sentences";

    fn block(&self) -> *const *mut c_char {
        self.sentences
    }

    fn count(&self) -> usize {
        self.count
    }

    unsafe fn release_with(&mut self, api: &EngineApi) {
        (api.free_sentence_array)(self);
    }
}

impl TokenArray {
    /// The empty descriptor the engine returns when it has nothing to say
    pub const fn empty() -> Self {
        Self {
            tokens: ptr::null_mut(),
            count: 0,
        }
    }
}

impl EntityArray {
    /// The empty descriptor the engine returns when it has nothing to say
    pub const fn empty() -> Self {
        Self {
            entities: ptr::null_mut(),
            count: 0,
        }
    }
}

impl SentenceArray {
    /// The empty descriptor the engine returns when it has nothing to say
    pub const fn empty() -> Self {
        Self {
            sentences: ptr::null_mut(),
            count: 0,
        }
    }
}

/// View the record block of a descriptor as a slice
///
/// Returns an empty slice for `count == 0` without looking at the pointer,
/// and `None` when a non-zero count comes with a null block.
///
/// # Safety
/// For `count > 0` the block must hold `count` initialized records that
/// stay alive for the returned lifetime.
pub(crate) unsafe fn records<A: ForeignArray>(array: &A) -> Option<&[A::Record]> {
    let count = array.count();
    if count == 0 {
        return Some(&[]);
    }
    let block = array.block();
    if block.is_null() {
        return None;
    }
    Some(std::slice::from_raw_parts(block, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};
    use std::ptr::NonNull;

    #[test]
    fn test_layout_matches_c_header() {
        let word = size_of::<*const c_char>();
        // five pointers followed by two bools, padded to pointer alignment
        assert_eq!(size_of::<TokenRecord>(), 6 * word);
        assert_eq!(align_of::<TokenRecord>(), align_of::<*const c_char>());
        // two pointers followed by two ints
        assert_eq!(size_of::<EntityRecord>(), 2 * word + 2 * size_of::<c_int>());
        assert_eq!(size_of::<TokenArray>(), 2 * word);
        assert_eq!(size_of::<SentenceArray>(), 2 * word);
    }

    #[test]
    fn test_records_zero_count_ignores_pointer() {
        let array = TokenArray {
            tokens: NonNull::<TokenRecord>::dangling().as_ptr(),
            count: 0,
        };
        let view = unsafe { records(&array) };
        assert_eq!(view.map(|r| r.len()), Some(0));

        let array = EntityArray::empty();
        assert_eq!(unsafe { records(&array) }.map(|r| r.len()), Some(0));
    }

    #[test]
    fn test_records_null_block_with_count() {
        let array = SentenceArray {
            sentences: ptr::null_mut(),
            count: 3,
        };
        assert!(unsafe { records(&array) }.is_none());
    }
}
