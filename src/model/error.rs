use std::path::PathBuf;
use thiserror::Error;

use crate::parser::ParseError;

/// Errors raised while turning a source path into a [`super::Program`]
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Source path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("No Go files in {}", .0.display())]
    NoGoFiles(PathBuf),

    #[error("Found packages {first} and {second} in {}", .dir.display())]
    MixedPackages {
        dir: PathBuf,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LoadError>;
