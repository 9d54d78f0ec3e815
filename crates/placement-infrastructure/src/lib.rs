//! # Infrastructure Layer
//!
//! Cross-cutting technical concerns that support the domain and
//! application layers: structured logging and layered configuration.
//! Persistence adapters live in `placement-providers`, not here.
//!
//! | Component | Description |
//! |-----------|--------------|
//! | [`config`] | Layered `EngineConfig` loading (defaults, TOML file, env overlay) |
//! | [`logging`] | `tracing`/`tracing-subscriber` setup |

/// Layered configuration loading.
pub mod config;
/// Structured logging setup.
pub mod logging;

pub use config::{ConfigError, EngineConfig, LogFormat};
