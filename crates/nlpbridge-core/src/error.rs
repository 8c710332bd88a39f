//! Error types for the nlpbridge core library
//!
//! Every failure the bridge can surface is a variant of [`Error`]. None of
//! them are retried internally: given the same text and model the engine
//! fails the same way again.

use std::path::PathBuf;
use thiserror::Error;

use crate::handle::HandleState;

/// Main error type for bridge operations
#[derive(Error, Debug)]
pub enum Error {
    /// The engine refused to load the requested model
    #[error("Engine initialization failed for model '{model}': {message}")]
    Init {
        model: String,
        message: String,
        status: Option<i32>,
    },

    /// Another engine handle is still live in this process
    #[error("Engine already active with model '{active_model}'; close it before initializing '{requested_model}'")]
    EngineBusy {
        active_model: String,
        requested_model: String,
    },

    /// Text could not be carried across the boundary
    #[error("Encoding error in {context}: {message}")]
    Encoding { context: String, message: String },

    /// Operation invoked on a handle that is not `Ready`
    #[error("Engine handle is not ready (state: {state})")]
    NotReady { state: HandleState },

    /// The engine returned data that violates its contract
    #[error("Foreign call '{call}' failed: {message}")]
    ForeignCall { call: &'static str, message: String },

    /// Shared library or symbol could not be loaded
    #[error("Failed to load engine library {}: {message}", path.display())]
    Library {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<libloading::Error>,
    },

    /// Invalid engine configuration
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Internal invariant broken (e.g. poisoned lock after a prior panic)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an encoding error
    pub fn encoding(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encoding {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a foreign call error
    pub fn foreign_call(call: &'static str, message: impl Into<String>) -> Self {
        Self::ForeignCall {
            call,
            message: message.into(),
        }
    }

    /// Create a configuration error without a source
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short machine-readable category name
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Init { .. } => "init",
            Error::EngineBusy { .. } => "engine_busy",
            Error::Encoding { .. } => "encoding",
            Error::NotReady { .. } => "not_ready",
            Error::ForeignCall { .. } => "foreign_call",
            Error::Library { .. } => "library",
            Error::Configuration { .. } => "configuration",
            Error::Internal { .. } => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Init {
            model: "xx_missing".to_string(),
            message: "engine returned status -1".to_string(),
            status: Some(-1),
        };
        assert_eq!(
            err.to_string(),
            "Engine initialization failed for model 'xx_missing': engine returned status -1"
        );

        let err = Error::NotReady {
            state: HandleState::Closed,
        };
        assert_eq!(err.to_string(), "Engine handle is not ready (state: closed)");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::encoding("text", "nul byte").kind(), "encoding");
        assert_eq!(Error::foreign_call("spacy_tokenize", "null").kind(), "foreign_call");
        assert_eq!(Error::configuration("bad").kind(), "configuration");
    }
}
