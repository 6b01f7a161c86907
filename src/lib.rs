//! rpcglue finds the RPC methods of a Go service declaration and generates a
//! typed Go client for them.

pub mod config;
pub mod core;
pub mod generator;
pub mod model;
pub mod parser;
pub mod scanner;
pub mod shape;
pub mod walker;
pub mod writer;

pub use crate::core::{GlueError, Result};
pub use walker::{Directions, RunReport, Walker};
