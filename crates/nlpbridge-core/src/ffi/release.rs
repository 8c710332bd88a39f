//! Scoped release of engine-allocated descriptors
//!
//! A [`ReleaseGuard`] takes ownership of a descriptor the moment the foreign
//! call returns and hands it to the engine's free function exactly once,
//! whether the operation finishes normally, returns an error, or unwinds.

use tracing::trace;

use super::engine::EngineApi;
use super::records::ForeignArray;

/// Owns a foreign descriptor until it is released
pub struct ReleaseGuard<'a, A: ForeignArray> {
    api: &'a EngineApi,
    array: A,
    released: bool,
}

impl<'a, A: ForeignArray> ReleaseGuard<'a, A> {
    /// Take ownership of a descriptor returned by `api`
    ///
    /// # Safety
    /// `array` must come straight from the engine call `A::CALL` on `api`
    /// and must not be released anywhere else.
    pub unsafe fn new(api: &'a EngineApi, array: A) -> Self {
        Self {
            api,
            array,
            released: false,
        }
    }

    /// Borrow the descriptor for conversion
    pub fn array(&self) -> &A {
        &self.array
    }

    /// Release now instead of at end of scope
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        trace!(call = A::CALL, count = self.array.count(), "Releasing foreign array");
        // SAFETY: guaranteed by the contract of `new`; the flag above keeps
        // this to a single call per descriptor.
        unsafe { self.array.release_with(self.api) };
    }
}

impl<A: ForeignArray> Drop for ReleaseGuard<'_, A> {
    fn drop(&mut self) {
        self.release_once();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::records::{EntityArray, SentenceArray, TokenArray};
    use std::os::raw::{c_char, c_int};
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Each test owns its own counter so parallel tests do not interfere.
    static TOKEN_FREES: AtomicUsize = AtomicUsize::new(0);
    static ENTITY_FREES: AtomicUsize = AtomicUsize::new(0);
    static SENTENCE_FREES: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn init(_: *const c_char) -> c_int {
        0
    }
    unsafe extern "C" fn cleanup() {}
    unsafe extern "C" fn tokenize(_: *const c_char) -> TokenArray {
        TokenArray::empty()
    }
    unsafe extern "C" fn free_tokens(arr: *mut TokenArray) {
        TOKEN_FREES.fetch_add(1, Ordering::SeqCst);
        (*arr).count = 0;
    }
    unsafe extern "C" fn entities(_: *const c_char) -> EntityArray {
        EntityArray::empty()
    }
    unsafe extern "C" fn free_entities(arr: *mut EntityArray) {
        ENTITY_FREES.fetch_add(1, Ordering::SeqCst);
        (*arr).count = 0;
    }
    unsafe extern "C" fn sentences(_: *const c_char) -> SentenceArray {
        SentenceArray::empty()
    }
    unsafe extern "C" fn free_sentences(arr: *mut SentenceArray) {
        SENTENCE_FREES.fetch_add(1, Ordering::SeqCst);
        (*arr).count = 0;
    }

    fn counting_api() -> EngineApi {
        EngineApi {
            init,
            cleanup,
            tokenize,
            free_token_array: free_tokens,
            extract_entities: entities,
            free_entity_array: free_entities,
            split_sentences: sentences,
            free_sentence_array: free_sentences,
        }
    }

    #[test]
    fn test_release_on_drop_for_zero_count() {
        let api = counting_api();
        let before = TOKEN_FREES.load(Ordering::SeqCst);
        {
            let _guard = unsafe { ReleaseGuard::new(&api, TokenArray::empty()) };
        }
        assert_eq!(TOKEN_FREES.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_explicit_release_is_not_repeated_on_drop() {
        let api = counting_api();
        let before = ENTITY_FREES.load(Ordering::SeqCst);
        let guard = unsafe { ReleaseGuard::new(&api, EntityArray::empty()) };
        guard.release();
        assert_eq!(ENTITY_FREES.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_release_runs_on_error_path() {
        fn failing(api: &EngineApi) -> Result<(), &'static str> {
            let guard = unsafe { ReleaseGuard::new(api, SentenceArray::empty()) };
            if guard.array().count() == 0 {
                return Err("nothing to decode");
            }
            guard.release();
            Ok(())
        }

        let api = counting_api();
        let before = SENTENCE_FREES.load(Ordering::SeqCst);
        assert!(failing(&api).is_err());
        assert_eq!(SENTENCE_FREES.load(Ordering::SeqCst), before + 1);
    }
}
