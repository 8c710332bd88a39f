//! In-process stub engine speaking the engine C ABI
//!
//! The stub exports the same eight functions as a real engine library and
//! follows the same ownership rules: every string and every record block it
//! hands out is its own allocation, and only its free functions give them
//! back. That makes it suitable for exercising the bridge end to end without
//! a language runtime installed.
//!
//! Annotations come from a small rule set (whitespace tokens, a closed-class
//! lexicon, capitalized runs as entities). Tests that need exact output can
//! script a response per input text.
//!
//! The stub keeps process-wide state, just like the engine it stands in for.
//! Tests that use it must not run concurrently with each other.

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::ffi::engine::{EngineApi, EngineBinding, EngineOrigin};
use crate::ffi::records::{EntityArray, EntityRecord, SentenceArray, TokenArray, TokenRecord};
use crate::types::{Entity, Token};

/// Model name the stub refuses to load
pub const FAILING_MODEL: &str = "xx_missing_model";

static LOADED_MODEL: Mutex<Option<String>> = Mutex::new(None);
static SCRIPTS: Mutex<Option<Scripts>> = Mutex::new(None);
static DANGLING_EMPTY: AtomicBool = AtomicBool::new(false);

static LIVE_STRINGS: AtomicIsize = AtomicIsize::new(0);
static LIVE_BLOCKS: AtomicIsize = AtomicIsize::new(0);
static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);
static CLEANUP_CALLS: AtomicUsize = AtomicUsize::new(0);
static TOKEN_FREES: AtomicUsize = AtomicUsize::new(0);
static ENTITY_FREES: AtomicUsize = AtomicUsize::new(0);
static SENTENCE_FREES: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct Scripts {
    tokens: HashMap<String, Vec<Token>>,
    entities: HashMap<String, Vec<Entity>>,
    sentences: HashMap<String, Vec<String>>,
}

/// Snapshot of the stub's allocation and call counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StubStats {
    /// Strings handed out and not yet freed
    pub live_strings: isize,
    /// Record blocks handed out and not yet freed
    pub live_blocks: isize,
    pub init_calls: usize,
    pub cleanup_calls: usize,
    pub token_frees: usize,
    pub entity_frees: usize,
    pub sentence_frees: usize,
}

impl StubStats {
    /// Total number of free-function calls of any kind
    pub fn total_frees(&self) -> usize {
        self.token_frees + self.entity_frees + self.sentence_frees
    }
}

/// The stub's function table
pub fn api() -> EngineApi {
    EngineApi {
        init: stub_init,
        cleanup: stub_cleanup,
        tokenize: stub_tokenize,
        free_token_array: stub_free_token_array,
        extract_entities: stub_extract_entities,
        free_entity_array: stub_free_entity_array,
        split_sentences: stub_split_sentences,
        free_sentence_array: stub_free_sentence_array,
    }
}

/// A binding to the stub engine
pub fn binding() -> EngineBinding {
    EngineBinding::from_api(api(), EngineOrigin::Stub)
}

/// Read the counters
pub fn stats() -> StubStats {
    StubStats {
        live_strings: LIVE_STRINGS.load(Ordering::SeqCst),
        live_blocks: LIVE_BLOCKS.load(Ordering::SeqCst),
        init_calls: INIT_CALLS.load(Ordering::SeqCst),
        cleanup_calls: CLEANUP_CALLS.load(Ordering::SeqCst),
        token_frees: TOKEN_FREES.load(Ordering::SeqCst),
        entity_frees: ENTITY_FREES.load(Ordering::SeqCst),
        sentence_frees: SENTENCE_FREES.load(Ordering::SeqCst),
    }
}

/// Model currently loaded, if any
pub fn loaded_model() -> Option<String> {
    lock(&LOADED_MODEL).clone()
}

/// Drop all scripted responses and leave dangling-empty mode
pub fn reset() {
    *lock(&SCRIPTS) = None;
    DANGLING_EMPTY.store(false, Ordering::SeqCst);
}

/// Answer `spacy_tokenize(text)` with exactly `tokens`
pub fn script_tokens(text: &str, tokens: Vec<Token>) {
    with_scripts(|s| {
        s.tokens.insert(text.to_string(), tokens);
    });
}

/// Answer `spacy_extract_entities(text)` with exactly `entities`
pub fn script_entities(text: &str, entities: Vec<Entity>) {
    with_scripts(|s| {
        s.entities.insert(text.to_string(), entities);
    });
}

/// Answer `spacy_split_sentences(text)` with exactly `sentences`
pub fn script_sentences(text: &str, sentences: Vec<String>) {
    with_scripts(|s| {
        s.sentences.insert(text.to_string(), sentences);
    });
}

/// Return empty results as a non-null dangling pointer with a zero count
///
/// Any attempt by the caller to read or free such a block is a bug.
pub fn set_dangling_empty(enabled: bool) {
    DANGLING_EMPTY.store(enabled, Ordering::SeqCst);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn with_scripts(f: impl FnOnce(&mut Scripts)) {
    let mut guard = lock(&SCRIPTS);
    f(guard.get_or_insert_with(Scripts::default));
}

// ---------------------------------------------------------------------------
// Exported functions
// ---------------------------------------------------------------------------

/// Run `f`, returning `fallback` if it panics
fn no_unwind<R>(call: &str, fallback: R, f: impl FnOnce() -> R) -> R {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic_info) => {
            let msg = if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else {
                "Unknown panic".to_string()
            };
            warn!(call, panic = %msg, "Stub engine panicked");
            fallback
        }
    }
}

unsafe fn input_text(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

fn engine_ready(call: &str) -> bool {
    let ready = lock(&LOADED_MODEL).is_some();
    if !ready {
        warn!(call, "Stub engine not initialized");
    }
    ready
}

unsafe extern "C" fn stub_init(model_name: *const c_char) -> c_int {
    no_unwind("spacy_init", -1, || {
        INIT_CALLS.fetch_add(1, Ordering::SeqCst);
        let model = match input_text(model_name) {
            Some(model) if !model.is_empty() && model != FAILING_MODEL => model,
            _ => return -1,
        };
        *lock(&LOADED_MODEL) = Some(model);
        0
    })
}

unsafe extern "C" fn stub_cleanup() {
    no_unwind("spacy_cleanup", (), || {
        CLEANUP_CALLS.fetch_add(1, Ordering::SeqCst);
        *lock(&LOADED_MODEL) = None;
    })
}

unsafe extern "C" fn stub_tokenize(text: *const c_char) -> TokenArray {
    no_unwind("spacy_tokenize", TokenArray::empty(), || {
        let Some(text) = input_text(text) else {
            return TokenArray::empty();
        };
        if !engine_ready("spacy_tokenize") {
            return TokenArray::empty();
        }
        let scripted = lock(&SCRIPTS)
            .as_ref()
            .and_then(|s| s.tokens.get(&text).cloned());
        let tokens = scripted.unwrap_or_else(|| annotate(&text).into_iter().map(|p| p.token).collect());

        let records = tokens
            .iter()
            .map(|t| TokenRecord {
                text: alloc_str(&t.text),
                lemma: alloc_str(&t.lemma),
                pos: alloc_str(&t.pos),
                tag: alloc_str(&t.tag),
                dep: alloc_str(&t.dep),
                is_stop: t.is_stop,
                is_punct: t.is_punct,
            })
            .collect();
        let (tokens, count) = alloc_block(records);
        TokenArray { tokens, count }
    })
}

unsafe extern "C" fn stub_free_token_array(arr: *mut TokenArray) {
    no_unwind("free_token_array", (), || {
        TOKEN_FREES.fetch_add(1, Ordering::SeqCst);
        let Some(arr) = arr.as_mut() else {
            return;
        };
        if arr.count > 0 && !arr.tokens.is_null() {
            for record in std::slice::from_raw_parts(arr.tokens, arr.count) {
                free_str(record.text);
                free_str(record.lemma);
                free_str(record.pos);
                free_str(record.tag);
                free_str(record.dep);
            }
        }
        free_block(arr.tokens, arr.count);
        arr.tokens = ptr::null_mut();
        arr.count = 0;
    })
}

unsafe extern "C" fn stub_extract_entities(text: *const c_char) -> EntityArray {
    no_unwind("spacy_extract_entities", EntityArray::empty(), || {
        let Some(text) = input_text(text) else {
            return EntityArray::empty();
        };
        if !engine_ready("spacy_extract_entities") {
            return EntityArray::empty();
        }
        let scripted = lock(&SCRIPTS)
            .as_ref()
            .and_then(|s| s.entities.get(&text).cloned());
        let entities = scripted.unwrap_or_else(|| find_entities(&text, &annotate(&text)));

        let records = entities
            .iter()
            .map(|e| EntityRecord {
                text: alloc_str(&e.text),
                label: alloc_str(&e.label),
                start: c_int::try_from(e.start).unwrap_or(c_int::MAX),
                end: c_int::try_from(e.end).unwrap_or(c_int::MAX),
            })
            .collect();
        let (entities, count) = alloc_block(records);
        EntityArray { entities, count }
    })
}

unsafe extern "C" fn stub_free_entity_array(arr: *mut EntityArray) {
    no_unwind("free_entity_array", (), || {
        ENTITY_FREES.fetch_add(1, Ordering::SeqCst);
        let Some(arr) = arr.as_mut() else {
            return;
        };
        if arr.count > 0 && !arr.entities.is_null() {
            for record in std::slice::from_raw_parts(arr.entities, arr.count) {
                free_str(record.text);
                free_str(record.label);
            }
        }
        free_block(arr.entities, arr.count);
        arr.entities = ptr::null_mut();
        arr.count = 0;
    })
}

unsafe extern "C" fn stub_split_sentences(text: *const c_char) -> SentenceArray {
    no_unwind("spacy_split_sentences", SentenceArray::empty(), || {
        let Some(text) = input_text(text) else {
            return SentenceArray::empty();
        };
        if !engine_ready("spacy_split_sentences") {
            return SentenceArray::empty();
        }
        let scripted = lock(&SCRIPTS)
            .as_ref()
            .and_then(|s| s.sentences.get(&text).cloned());
        let sentences = scripted.unwrap_or_else(|| split(&text));

        let records = sentences.iter().map(|s| alloc_str(s)).collect();
        let (sentences, count) = alloc_block(records);
        SentenceArray { sentences, count }
    })
}

unsafe extern "C" fn stub_free_sentence_array(arr: *mut SentenceArray) {
    no_unwind("free_sentence_array", (), || {
        SENTENCE_FREES.fetch_add(1, Ordering::SeqCst);
        let Some(arr) = arr.as_mut() else {
            return;
        };
        if arr.count > 0 && !arr.sentences.is_null() {
            for &sentence in std::slice::from_raw_parts(arr.sentences, arr.count) {
                free_str(sentence);
            }
        }
        free_block(arr.sentences, arr.count);
        arr.sentences = ptr::null_mut();
        arr.count = 0;
    })
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

fn alloc_str(s: &str) -> *mut c_char {
    let owned = CString::new(s.replace('\0', "")).unwrap_or_default();
    LIVE_STRINGS.fetch_add(1, Ordering::SeqCst);
    owned.into_raw()
}

unsafe fn free_str(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    drop(CString::from_raw(ptr as *mut c_char));
    LIVE_STRINGS.fetch_sub(1, Ordering::SeqCst);
}

fn alloc_block<T>(records: Vec<T>) -> (*mut T, usize) {
    if records.is_empty() {
        let block = if DANGLING_EMPTY.load(Ordering::SeqCst) {
            NonNull::dangling().as_ptr()
        } else {
            ptr::null_mut()
        };
        return (block, 0);
    }
    let count = records.len();
    LIVE_BLOCKS.fetch_add(1, Ordering::SeqCst);
    (Box::into_raw(records.into_boxed_slice()) as *mut T, count)
}

unsafe fn free_block<T>(block: *mut T, count: usize) {
    // Empty results never own a block, dangling or not.
    if count == 0 || block.is_null() {
        return;
    }
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(block, count)));
    LIVE_BLOCKS.fetch_sub(1, Ordering::SeqCst);
}

// ---------------------------------------------------------------------------
// Rule-based annotation
// ---------------------------------------------------------------------------

struct Piece {
    token: Token,
    start: usize,
    end: usize,
}

const DETERMINERS: &[&str] = &["the", "a", "an", "this", "that", "these", "those"];
const ADPOSITIONS: &[&str] = &["in", "on", "of", "by", "at", "over", "to", "from", "with", "for"];
const AUXILIARIES: &[&str] = &["is", "was", "are", "were", "be", "been", "has", "have", "had"];
const PRONOUNS: &[&str] = &["i", "you", "he", "she", "it", "we", "they", "its"];
const CONJUNCTIONS: &[&str] = &["and", "or", "but"];
const ORG_SUFFIXES: &[&str] = &["Inc", "Corp", "Ltd", "LLC", "Company"];

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn classify(word: &str) -> (&'static str, &'static str, bool) {
    let lower = word.to_lowercase();
    let lower = lower.as_str();
    if word.chars().all(|c| c.is_ascii_punctuation()) {
        let tag = match word {
            "." | "!" | "?" => ".",
            "," => ",",
            _ => "NFP",
        };
        return ("PUNCT", tag, false);
    }
    if DETERMINERS.contains(&lower) {
        return ("DET", "DT", true);
    }
    if ADPOSITIONS.contains(&lower) {
        return ("ADP", "IN", true);
    }
    if AUXILIARIES.contains(&lower) {
        let tag = if matches!(lower, "was" | "were" | "had") { "VBD" } else { "VBZ" };
        return ("AUX", tag, true);
    }
    if PRONOUNS.contains(&lower) {
        return ("PRON", "PRP", true);
    }
    if CONJUNCTIONS.contains(&lower) {
        return ("CCONJ", "CC", true);
    }
    if word.chars().any(|c| c.is_ascii_digit()) {
        return ("NUM", "CD", false);
    }
    if word.chars().next().is_some_and(char::is_uppercase) {
        return ("PROPN", "NNP", false);
    }
    if lower.len() > 4 && lower.ends_with("ed") {
        return ("VERB", "VBD", false);
    }
    if lower.len() > 5 && lower.ends_with("ing") {
        return ("VERB", "VBG", false);
    }
    if lower.len() > 4 && lower.ends_with("ly") {
        return ("ADV", "RB", false);
    }
    ("NOUN", "NN", false)
}

fn lemmatize(word: &str, pos: &str) -> String {
    match pos {
        "PROPN" | "PUNCT" | "NUM" => word.to_string(),
        "VERB" => {
            let lower = word.to_lowercase();
            let stem = lower
                .strip_suffix("ed")
                .or_else(|| lower.strip_suffix("ing"))
                .unwrap_or(&lower);
            stem.to_string()
        }
        _ => word.to_lowercase(),
    }
}

/// Split on whitespace, peeling leading and trailing punctuation into
/// tokens of their own. Offsets are in characters.
fn segment(text: &str) -> Vec<(String, usize, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        let chunk_start = i;
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        let chunk_end = i;

        let mut word_start = chunk_start;
        while word_start < chunk_end && chars[word_start].is_ascii_punctuation() {
            word_start += 1;
        }
        let mut word_end = chunk_end;
        while word_end > word_start && chars[word_end - 1].is_ascii_punctuation() {
            word_end -= 1;
        }

        for p in chunk_start..word_start {
            pieces.push((chars[p].to_string(), p, p + 1));
        }
        if word_start < word_end {
            pieces.push((chars[word_start..word_end].iter().collect(), word_start, word_end));
        }
        for p in word_end.max(word_start)..chunk_end {
            pieces.push((chars[p].to_string(), p, p + 1));
        }
    }
    pieces
}

fn annotate(text: &str) -> Vec<Piece> {
    let mut seen_predicate = false;
    segment(text)
        .into_iter()
        .map(|(word, start, end)| {
            let (pos, tag, is_stop) = classify(&word);
            let dep = match pos {
                "PUNCT" => "punct",
                "DET" => "det",
                "ADP" => "prep",
                "AUX" => "aux",
                "CCONJ" => "cc",
                "NUM" => "nummod",
                "ADV" => "advmod",
                "VERB" => "ROOT",
                _ if seen_predicate => "pobj",
                _ => "nsubj",
            };
            if matches!(pos, "VERB" | "AUX") {
                seen_predicate = true;
            }
            if pos == "PUNCT" && word.chars().all(is_sentence_end) {
                seen_predicate = false;
            }
            Piece {
                token: Token {
                    lemma: lemmatize(&word, pos),
                    text: word,
                    pos: pos.to_string(),
                    tag: tag.to_string(),
                    dep: dep.to_string(),
                    is_stop,
                    is_punct: pos == "PUNCT",
                },
                start,
                end,
            }
        })
        .collect()
}

fn find_entities(text: &str, pieces: &[Piece]) -> Vec<Entity> {
    let chars: Vec<char> = text.chars().collect();
    let mut entities = Vec::new();
    let mut i = 0;
    while i < pieces.len() {
        let pos = pieces[i].token.pos.as_str();
        if pos != "PROPN" && pos != "NUM" {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < pieces.len() && pieces[i].token.pos == pos {
            i += 1;
        }
        let run = &pieces[run_start..i];
        let start = run[0].start;
        let end = run[run.len() - 1].end;
        let label = if pos == "NUM" {
            "CARDINAL"
        } else if run.iter().any(|p| ORG_SUFFIXES.contains(&p.token.text.as_str())) {
            "ORG"
        } else {
            "MISC"
        };
        entities.push(Entity {
            text: chars[start..end].iter().collect(),
            label: label.to_string(),
            start,
            end,
        });
    }
    entities
}

fn split(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    for i in 0..chars.len() {
        let at_boundary = is_sentence_end(chars[i])
            && chars.get(i + 1).map_or(true, |c| c.is_whitespace());
        if at_boundary {
            push_trimmed(&mut sentences, &chars[start..=i]);
            start = i + 1;
        }
    }
    push_trimmed(&mut sentences, &chars[start..]);
    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, chars: &[char]) {
    let sentence: String = chars.iter().collect();
    let sentence = sentence.trim();
    if !sentence.is_empty() {
        sentences.push(sentence.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_peels_punctuation() {
        let words: Vec<String> = segment("Hello, world! (really)")
            .into_iter()
            .map(|(w, _, _)| w)
            .collect();
        assert_eq!(words, ["Hello", ",", "world", "!", "(", "really", ")"]);
    }

    #[test]
    fn test_segment_offsets_are_characters() {
        let pieces = segment("Zürich ist schön.");
        assert_eq!(pieces[0], ("Zürich".to_string(), 0, 6));
        assert_eq!(pieces[2], ("schön".to_string(), 11, 16));
        assert_eq!(pieces[3], (".".to_string(), 16, 17));
    }

    #[test]
    fn test_annotate_lexicon() {
        let pieces = annotate("The company was founded in Cupertino.");
        let pos: Vec<&str> = pieces.iter().map(|p| p.token.pos.as_str()).collect();
        assert_eq!(pos, ["DET", "NOUN", "AUX", "VERB", "ADP", "PROPN", "PUNCT"]);
        assert_eq!(pieces[3].token.lemma, "found");
        assert!(pieces[0].token.is_stop);
        assert!(pieces[6].token.is_punct);
        assert_eq!(pieces[1].token.dep, "nsubj");
        assert_eq!(pieces[5].token.dep, "pobj");
    }

    #[test]
    fn test_find_entities() {
        let text = "Apple Inc. was founded by Steve Jobs in 1976.";
        let entities = find_entities(text, &annotate(text));
        let summary: Vec<(&str, &str)> = entities
            .iter()
            .map(|e| (e.text.as_str(), e.label.as_str()))
            .collect();
        assert_eq!(
            summary,
            [("Apple Inc", "ORG"), ("Steve Jobs", "MISC"), ("1976", "CARDINAL")]
        );
        for entity in &entities {
            assert_eq!(entity.span_in(text), Some(entity.text.as_str()));
        }
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(split("First. Second. Third."), ["First.", "Second.", "Third."]);
        assert_eq!(split("Version 2.0 shipped! Did it work?  Yes"), [
            "Version 2.0 shipped!",
            "Did it work?",
            "Yes"
        ]);
        assert!(split("   ").is_empty());
    }
}
