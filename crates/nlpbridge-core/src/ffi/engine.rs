//! Engine function table and the bindings that provide it
//!
//! The annotation engine is reached exclusively through [`EngineApi`], a
//! table of C function pointers. A table comes either from a shared library
//! opened at runtime or from the in-process stub engine.

use std::fmt;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use tracing::{debug, info};

use super::records::{EntityArray, SentenceArray, TokenArray};
use crate::error::{Error, Result};

/// Exported symbol names of the engine library
pub mod symbols {
    pub const INIT: &[u8] = b"spacy_init\0";
    pub const CLEANUP: &[u8] = b"spacy_cleanup\0";
    pub const TOKENIZE: &[u8] = b"spacy_tokenize\0";
    pub const FREE_TOKEN_ARRAY: &[u8] = b"free_token_array\0";
    pub const EXTRACT_ENTITIES: &[u8] = b"spacy_extract_entities\0";
    pub const FREE_ENTITY_ARRAY: &[u8] = b"free_entity_array\0";
    pub const SPLIT_SENTENCES: &[u8] = b"spacy_split_sentences\0";
    pub const FREE_SENTENCE_ARRAY: &[u8] = b"free_sentence_array\0";
}

pub type InitFn = unsafe extern "C" fn(model_name: *const c_char) -> c_int;
pub type CleanupFn = unsafe extern "C" fn();
pub type TokenizeFn = unsafe extern "C" fn(text: *const c_char) -> TokenArray;
pub type FreeTokenArrayFn = unsafe extern "C" fn(arr: *mut TokenArray);
pub type ExtractEntitiesFn = unsafe extern "C" fn(text: *const c_char) -> EntityArray;
pub type FreeEntityArrayFn = unsafe extern "C" fn(arr: *mut EntityArray);
pub type SplitSentencesFn = unsafe extern "C" fn(text: *const c_char) -> SentenceArray;
pub type FreeSentenceArrayFn = unsafe extern "C" fn(arr: *mut SentenceArray);

/// The engine's C surface as a table of function pointers
#[derive(Clone, Copy)]
pub struct EngineApi {
    pub init: InitFn,
    pub cleanup: CleanupFn,
    pub tokenize: TokenizeFn,
    pub free_token_array: FreeTokenArrayFn,
    pub extract_entities: ExtractEntitiesFn,
    pub free_entity_array: FreeEntityArrayFn,
    pub split_sentences: SplitSentencesFn,
    pub free_sentence_array: FreeSentenceArrayFn,
}

impl fmt::Debug for EngineApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineApi").finish_non_exhaustive()
    }
}

/// Where an engine binding came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOrigin {
    /// Shared library opened at runtime
    Library(PathBuf),
    /// In-process stub engine
    Stub,
}

impl fmt::Display for EngineOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineOrigin::Library(path) => write!(f, "library {}", path.display()),
            EngineOrigin::Stub => write!(f, "stub"),
        }
    }
}

/// An engine function table together with whatever keeps it callable
#[derive(Clone)]
pub struct EngineBinding {
    api: EngineApi,
    origin: EngineOrigin,
    // Function pointers in `api` are only valid while the library is mapped.
    _library: Option<Arc<Library>>,
}

impl EngineBinding {
    /// Bind to an engine whose functions are linked into this process
    pub fn from_api(api: EngineApi, origin: EngineOrigin) -> Self {
        Self {
            api,
            origin,
            _library: None,
        }
    }

    /// Open an engine shared library and resolve its exported functions
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading engine library");

        // SAFETY: loading runs the library's initializers; the engine library
        // is trusted configuration, like any linked dependency.
        let library = unsafe { Library::new(path) }.map_err(|e| Error::Library {
            path: path.to_path_buf(),
            message: "could not open shared library".to_string(),
            source: Some(e),
        })?;

        // SAFETY: each symbol is declared with the signature of the engine header.
        let api = unsafe {
            EngineApi {
                init: resolve::<InitFn>(&library, path, symbols::INIT)?,
                cleanup: resolve::<CleanupFn>(&library, path, symbols::CLEANUP)?,
                tokenize: resolve::<TokenizeFn>(&library, path, symbols::TOKENIZE)?,
                free_token_array: resolve::<FreeTokenArrayFn>(&library, path, symbols::FREE_TOKEN_ARRAY)?,
                extract_entities: resolve::<ExtractEntitiesFn>(&library, path, symbols::EXTRACT_ENTITIES)?,
                free_entity_array: resolve::<FreeEntityArrayFn>(&library, path, symbols::FREE_ENTITY_ARRAY)?,
                split_sentences: resolve::<SplitSentencesFn>(&library, path, symbols::SPLIT_SENTENCES)?,
                free_sentence_array: resolve::<FreeSentenceArrayFn>(&library, path, symbols::FREE_SENTENCE_ARRAY)?,
            }
        };

        debug!(path = %path.display(), "Resolved all engine symbols");

        Ok(Self {
            api,
            origin: EngineOrigin::Library(path.to_path_buf()),
            _library: Some(Arc::new(library)),
        })
    }

    /// The function table
    pub fn api(&self) -> &EngineApi {
        &self.api
    }

    /// Where this binding came from
    pub fn origin(&self) -> &EngineOrigin {
        &self.origin
    }
}

impl fmt::Debug for EngineBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBinding")
            .field("origin", &self.origin)
            .finish()
    }
}

unsafe fn resolve<T: Copy>(library: &Library, path: &Path, symbol: &[u8]) -> Result<T> {
    let name = String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol)).into_owned();
    library
        .get::<T>(symbol)
        .map(|sym| *sym)
        .map_err(|e| Error::Library {
            path: path.to_path_buf(),
            message: format!("missing symbol '{}'", name),
            source: Some(e),
        })
}
