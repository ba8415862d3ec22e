//! Error types for the memoization layer
//!
//! The interceptor itself never fails: a failing computation hands back the
//! caller's own error untouched. The only errors owned by this crate are
//! configuration errors raised while decorating a service.

use thiserror::Error;

// == Config Error Enum ==
/// Errors raised while loading TTL configuration or decorating a service.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A method is marked cacheable but no TTL is configured for it
    #[error("No TTL configured for cacheable method: {method}")]
    MissingTtl { method: String },

    /// A TTL table key is not of the form `path::Type::method`
    #[error("Invalid method name in TTL table: {0}")]
    InvalidMethodName(String),

    /// A TTL table environment variable is set but not valid Unicode
    #[error("Environment variable {var} is not valid Unicode")]
    NotUnicode { var: String },

    /// The TTL table source could not be parsed
    #[error("Malformed TTL table: {0}")]
    Parse(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
