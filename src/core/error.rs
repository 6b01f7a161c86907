use std::fmt;
use thiserror::Error;

/// Main application error type that aggregates domain-specific errors
#[derive(Error, Debug)]
pub enum GlueError {
    /// Configuration layer errors
    #[error(transparent)]
    Config(#[from] crate::config::error::ConfigError),

    /// Loading the Go sources failed
    #[error(transparent)]
    Load(#[from] crate::model::error::LoadError),

    /// The target declaration is missing or has no usable methods
    #[error(transparent)]
    Discovery(#[from] crate::scanner::DiscoveryError),

    /// Rendering or formatting a client failed
    #[error(transparent)]
    Generate(#[from] crate::generator::GenerateError),

    /// Writing a generated file failed
    #[error(transparent)]
    Sink(#[from] crate::writer::SinkError),

    /// A package unit panicked or was cancelled
    #[error("Task failed: {0}")]
    Join(String),

    /// One or more package units failed; the others still ran
    #[error("{}", summarize(.0))]
    Units(Vec<UnitFailure>),
}

/// Result type alias for rpcglue operations
pub type Result<T> = std::result::Result<T, GlueError>;

/// A package that could not be turned into a client
#[derive(Debug)]
pub struct UnitFailure {
    /// Import path of the package
    pub package: String,
    pub error: GlueError,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.package, self.error)
    }
}

fn summarize(failures: &[UnitFailure]) -> String {
    let mut message = format!("{} package(s) failed", failures.len());
    for failure in failures {
        message.push_str("\n  ");
        message.push_str(&failure.to_string());
    }
    message
}
