//! Placement Assistant Core Library
//!
//! Foundational utilities shared by every placement crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, CorpusConfig, ProviderConfig, RagConfig, RetryConfig};
pub use error::{AppError, AppResult};
