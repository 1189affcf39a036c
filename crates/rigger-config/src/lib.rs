//! Rigger Config
//!
//! This crate contains the serializable configuration for the rigger console.
//! It describes where the remote executor lives, how its endpoints are laid
//! out, how often outstanding tasks are polled, and the optional wall-clock
//! limit applied to a pipeline run.
//!
//! Configuration is loaded from a JSON file. Every section is optional; a
//! missing file or a missing field falls back to the defaults below.

mod console;
mod error;
mod executor;
mod polling;

pub use console::ConsoleConfig;
pub use error::ConfigError;
pub use executor::ExecutorConfig;
pub use polling::PollingConfig;
