use std::path::PathBuf;
use thiserror::Error;

/// Parser-specific errors
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to set language: {0}")]
    LanguageSetupFailed(String),

    #[error("Failed to parse source code")]
    ParseFailed,

    #[error("Invalid syntax at line {line}, column {column}: {message}")]
    SyntaxError {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("No package clause in {}", .0.display())]
    MissingPackageClause(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ParseError>;
