//! nlpbridge Core - Safe bridge to a foreign natural-language annotation engine
//!
//! The engine lives behind a C ABI: it allocates fixed-layout record arrays
//! and expects every one of them back through a matching free function. This
//! crate turns those arrays into owned Rust values and guarantees each one is
//! released exactly once.
//!
//! # Main Components
//!
//! - **Boundary** (`ffi`): records, marshaling, conversion and scoped release
//! - **Engine Handle**: single live engine per process, explicit lifecycle
//! - **Facade** (`Nlp`): tokenize, entities, sentences and derived maps
//! - **Stub Engine**: in-process engine behind the same ABI for tests and demos
//!
//! # Example
//!
//! ```no_run
//! use nlpbridge_core::{Nlp, Result};
//!
//! fn example() -> Result<()> {
//!     let nlp = Nlp::stub("en_core_web_sm")?;
//!     for token in nlp.tokenize("Apple is looking at buying a U.K. startup.")? {
//!         println!("{} {} {}", token.text, token.pos, token.dep);
//!     }
//!     nlp.close();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ffi;
pub mod handle;
pub mod nlp;
pub mod stub;
pub mod types;

// Re-export main types for convenience
pub use config::{Backend, EngineConfig, DEFAULT_MODEL};
pub use error::{Error, Result};
pub use ffi::{EngineApi, EngineBinding, EngineOrigin};
pub use handle::{EngineHandle, HandleState};
pub use nlp::Nlp;
pub use types::{Analysis, Entity, Token};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
