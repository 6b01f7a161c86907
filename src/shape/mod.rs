//! Method-shape strategies decide which methods are remotely callable and
//! how to read their argument and reply types.
//!
//! Strategies compose: [`LeadingContext`] adapts any base strategy to a
//! convention that carries one extra leading parameter.

pub mod leading_context;
pub mod plain;

pub use leading_context::LeadingContext;
pub use plain::Plain;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::{Func, Type};

/// Metadata about an argument or reply type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// The type with its top-level pointer removed
    pub ty: Type,
    /// Printable form qualified by package names, e.g. `math.SumArg`
    pub identifier: String,
    /// Vendor-stripped import paths the identifier needs
    pub imports: BTreeSet<String>,
}

impl TypeInfo {
    pub fn new(ty: Type) -> Self {
        Self {
            identifier: ty.to_string(),
            imports: ty.import_paths(),
            ty,
        }
    }
}

/// A calling convention for RPC methods
pub trait MethodShape: Send + Sync {
    /// Short convention name used in logs
    fn name(&self) -> &'static str;

    fn is_suitable(&self, method: &Func) -> bool;

    /// `None` when the method does not have the parameter at all
    fn arg_type(&self, method: &Func) -> Option<TypeInfo>;

    fn reply_type(&self, method: &Func) -> Option<TypeInfo>;
}

/// Calling conventions selectable from the CLI or config
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
    /// net/rpc: `Method(arg T, reply *R) error`
    #[default]
    Plain,
    /// gorilla/rpc: `Method(r *http.Request, arg *T, reply *R) error`
    Gorilla,
}

impl Convention {
    pub fn shape(self) -> Box<dyn MethodShape> {
        match self {
            Convention::Plain => Box::new(Plain),
            Convention::Gorilla => Box::new(LeadingContext::new(Plain)),
        }
    }
}
