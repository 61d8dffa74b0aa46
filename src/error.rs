
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StratusError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Parse error at line {line}: {message}")]
    Parse { message: String, line: usize },
    #[error("property '{key}': expected {expected}, got {actual}")]
    Codec {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("resource '{id}' not found with type '{kind}'")]
    NotFound { kind: String, id: String },
    #[error("no resource of kind '{kind}' named '{name}'")]
    AliasNotFound { kind: String, name: String },
    #[error("alias '{name}' is ambiguous: {count} resources of kind '{kind}' share it")]
    AmbiguousAlias {
        kind: String,
        name: String,
        count: usize,
    },
    #[error("unresolved reference '${name}'")]
    UnresolvedReference { name: String },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Dry run error: {0}")]
    DryRun(String),
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("timed out after {after:?}")]
    Timeout { after: Duration },
    #[error("Driver registry error: {0}")]
    Registry(String),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, StratusError>;

// Helper conversions
impl From<config::ConfigError> for StratusError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<std::io::Error> for StratusError {
    fn from(e: std::io::Error) -> Self {
        Self::Config(e.to_string())
    }
}
