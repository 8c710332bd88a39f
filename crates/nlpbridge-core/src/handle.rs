//! Engine handle lifecycle
//!
//! The engine keeps global state on its side of the boundary and supports a
//! single loaded model per process. [`EngineHandle`] is the only way to reach
//! it: a handle exists only after a successful `initialize`, serializes every
//! call through a mutex it owns, and finalizes the engine exactly once.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::ffi::{encode, EngineApi, EngineBinding, EngineOrigin};

/// Model name of the live handle in this process, if any
static ACTIVE_ENGINE: Mutex<Option<String>> = Mutex::new(None);

/// Lifecycle state of a handle
///
/// There is no uninitialized state: a handle that failed to initialize is
/// never constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleState {
    Ready,
    Closed,
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleState::Ready => write!(f, "ready"),
            HandleState::Closed => write!(f, "closed"),
        }
    }
}

/// Owner of the process-wide engine instance
pub struct EngineHandle {
    binding: EngineBinding,
    model: String,
    state: Mutex<HandleState>,
}

impl EngineHandle {
    /// Load `model` into the engine behind `binding`
    ///
    /// Fails with [`Error::EngineBusy`] while another handle is live, and
    /// with [`Error::Init`] when the engine reports a nonzero status.
    pub fn initialize(binding: EngineBinding, model: &str) -> Result<Self> {
        let buffer = encode(model).map_err(|e| Error::Init {
            model: model.to_string(),
            message: e.to_string(),
            status: None,
        })?;

        let mut active = ACTIVE_ENGINE
            .lock()
            .map_err(|_| Error::internal("engine registry lock poisoned"))?;
        if let Some(active_model) = active.as_ref() {
            return Err(Error::EngineBusy {
                active_model: active_model.clone(),
                requested_model: model.to_string(),
            });
        }

        info!(model, origin = %binding.origin(), "Initializing engine");
        // SAFETY: no other handle is live, so nothing else is calling into
        // the engine; `buffer` outlives the call.
        let status = unsafe { (binding.api().init)(buffer.as_ptr()) };
        if status != 0 {
            warn!(model, status, "Engine rejected model");
            return Err(Error::Init {
                model: model.to_string(),
                message: format!("engine returned status {}", status),
                status: Some(status),
            });
        }

        *active = Some(model.to_string());
        Ok(Self {
            binding,
            model: model.to_string(),
            state: Mutex::new(HandleState::Ready),
        })
    }

    /// Model name the engine was initialized with
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn origin(&self) -> &EngineOrigin {
        self.binding.origin()
    }

    /// Current lifecycle state
    pub fn state(&self) -> HandleState {
        *lock_state(&self.state)
    }

    /// Run `f` against the engine while holding the handle's lock
    ///
    /// Fails with [`Error::NotReady`] once the handle is closed.
    pub fn with_ready<R>(&self, f: impl FnOnce(&EngineApi) -> Result<R>) -> Result<R> {
        let state = self
            .state
            .lock()
            .map_err(|_| Error::internal("engine handle lock poisoned by an earlier panic"))?;
        match *state {
            HandleState::Ready => f(self.binding.api()),
            HandleState::Closed => Err(Error::NotReady { state: *state }),
        }
    }

    /// Finalize the engine
    ///
    /// Returns `true` when this call performed the finalization and `false`
    /// when the handle was already closed.
    pub fn close(&self) -> bool {
        let mut state = lock_state(&self.state);
        if *state == HandleState::Closed {
            debug!(model = %self.model, "Engine handle already closed");
            return false;
        }

        info!(model = %self.model, "Closing engine");
        // SAFETY: the handle is Ready and its lock is held, so no operation
        // is in flight.
        unsafe { (self.binding.api().cleanup)() };
        *state = HandleState::Closed;
        *ACTIVE_ENGINE.lock().unwrap_or_else(PoisonError::into_inner) = None;
        true
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("model", &self.model)
            .field("origin", self.binding.origin())
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.close();
    }
}

// Closing must work even after a panicked operation poisoned the lock.
fn lock_state(state: &Mutex<HandleState>) -> MutexGuard<'_, HandleState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_initialize_and_close() {
        let handle = EngineHandle::initialize(stub::binding(), "en_core_web_sm").unwrap();
        assert_eq!(handle.state(), HandleState::Ready);
        assert_eq!(handle.model(), "en_core_web_sm");
        assert_eq!(stub::loaded_model().as_deref(), Some("en_core_web_sm"));

        assert!(handle.close());
        assert_eq!(handle.state(), HandleState::Closed);
        assert_eq!(stub::loaded_model(), None);
    }

    #[test]
    #[serial]
    fn test_close_is_idempotent() {
        let before = stub::stats().cleanup_calls;
        let handle = EngineHandle::initialize(stub::binding(), "en_core_web_sm").unwrap();
        assert!(handle.close());
        assert!(!handle.close());
        drop(handle);
        assert_eq!(stub::stats().cleanup_calls, before + 1);
    }

    #[test]
    #[serial]
    fn test_closed_handle_is_not_ready() {
        let handle = EngineHandle::initialize(stub::binding(), "en_core_web_sm").unwrap();
        handle.close();
        let err = handle.with_ready(|_| Ok(())).unwrap_err();
        assert!(matches!(
            err,
            Error::NotReady {
                state: HandleState::Closed
            }
        ));
    }

    #[test]
    #[serial]
    fn test_failed_init_leaves_engine_free() {
        let err = EngineHandle::initialize(stub::binding(), stub::FAILING_MODEL).unwrap_err();
        match err {
            Error::Init { status, .. } => assert_eq!(status, Some(-1)),
            other => panic!("unexpected error: {other}"),
        }
        let handle = EngineHandle::initialize(stub::binding(), "en_core_web_sm").unwrap();
        assert!(handle.close());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(HandleState::Ready.to_string(), "ready");
        assert_eq!(
            serde_json::to_string(&HandleState::Closed).unwrap(),
            "\"closed\""
        );
    }
}
