//! Core types, configuration, and utilities for the Openshelf account core.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, MultiSchemePolicy, DEFAULT_DRM_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
