//! Scalar text marshaling across the engine boundary
//!
//! Outbound text is copied into a NUL-terminated buffer the bridge owns and
//! frees itself. Inbound text is copied out of engine memory without taking
//! ownership; giving that memory back is the release guard's job.

use std::ffi::{CStr, CString};
use std::ops::Deref;
use std::os::raw::c_char;

use crate::error::{Error, Result};

/// NUL-terminated outbound text owned by the bridge
///
/// The buffer lives until this value is dropped, which must be after the
/// foreign call that reads it has returned.
#[derive(Debug)]
pub struct ForeignBuffer {
    inner: CString,
}

impl ForeignBuffer {
    /// Pointer to hand to the engine
    pub fn as_ptr(&self) -> *const c_char {
        self.inner.as_ptr()
    }

    /// Length in bytes, excluding the terminator
    pub fn len(&self) -> usize {
        self.inner.as_bytes().len()
    }

    /// Whether the encoded text is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Deref for ForeignBuffer {
    type Target = CStr;

    fn deref(&self) -> &CStr {
        &self.inner
    }
}

/// Encode text for an outbound foreign call
///
/// Fails only when the text contains an interior NUL, which the engine
/// would silently truncate at.
pub fn encode(text: &str) -> Result<ForeignBuffer> {
    CString::new(text)
        .map(|inner| ForeignBuffer { inner })
        .map_err(|e| {
            Error::encoding(
                "outbound text",
                format!("interior NUL byte at offset {}", e.nul_position()),
            )
        })
}

/// Copy a foreign NUL-terminated string into an owned `String`
///
/// `field` names the record field being decoded and only shows up in errors.
///
/// # Safety
/// A non-null `ptr` must point to a NUL-terminated buffer that stays valid
/// for the duration of the call.
pub unsafe fn decode(ptr: *const c_char, call: &'static str, field: &str) -> Result<String> {
    if ptr.is_null() {
        return Err(Error::foreign_call(call, format!("field '{}' is null", field)));
    }

    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Ok(s.to_owned()),
        Err(e) => Err(Error::encoding(
            format!("{} field '{}'", call, field),
            format!("invalid UTF-8 after {} valid bytes", e.valid_up_to()),
        )),
    }
}
