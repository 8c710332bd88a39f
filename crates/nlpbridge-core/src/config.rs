//! Engine selection and model configuration

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ffi::EngineBinding;
use crate::stub;

/// Model loaded when nothing else is configured
pub const DEFAULT_MODEL: &str = "en_core_web_sm";

pub const ENV_ENGINE: &str = "NLPBRIDGE_ENGINE";
pub const ENV_ENGINE_LIB: &str = "NLPBRIDGE_ENGINE_LIB";
pub const ENV_MODEL: &str = "NLPBRIDGE_MODEL";
/// Model variable understood by existing deployments of the engine
pub const ENV_MODEL_FALLBACK: &str = "SPACY_MODEL";

/// Where the engine functions come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Shared library opened at runtime
    #[default]
    Library,
    /// In-process stub engine
    Stub,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Library => write!(f, "library"),
            Backend::Stub => write!(f, "stub"),
        }
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "library" | "lib" => Ok(Backend::Library),
            "stub" => Ok(Backend::Stub),
            other => bail!("unknown engine backend '{}' (expected 'library' or 'stub')", other),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub backend: Backend,
    /// Path of the engine shared library, required by the library backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<PathBuf>,
    pub model: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            library: None,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl EngineConfig {
    /// Stub backend with the given model
    pub fn stub(model: impl Into<String>) -> Self {
        Self {
            backend: Backend::Stub,
            library: None,
            model: model.into(),
        }
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn merge_env(&mut self) -> Result<()> {
        self.merge_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    ///
    /// Empty values are treated as unset.
    pub fn merge_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = get(ENV_ENGINE) {
            self.backend = backend.parse().map_err(|e| Error::Configuration {
                message: format!("invalid {}", ENV_ENGINE),
                source: Some(e),
            })?;
        }
        if let Some(library) = get(ENV_ENGINE_LIB) {
            self.library = Some(PathBuf::from(library));
        }
        if let Some(model) = get(ENV_MODEL).or_else(|| get(ENV_MODEL_FALLBACK)) {
            self.model = model;
        }
        Ok(())
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::configuration("model name must not be empty"));
        }
        if self.backend == Backend::Library && self.library.is_none() {
            return Err(Error::configuration(format!(
                "the library backend needs a library path (set {} or use the stub backend)",
                ENV_ENGINE_LIB
            )));
        }
        Ok(())
    }

    /// Obtain the engine binding this configuration selects
    pub fn open_binding(&self) -> Result<EngineBinding> {
        self.validate()?;
        match (self.backend, &self.library) {
            (Backend::Stub, _) => Ok(stub::binding()),
            (Backend::Library, Some(path)) => EngineBinding::load(path),
            (Backend::Library, None) => Err(Error::configuration("missing library path")),
        }
    }
}
