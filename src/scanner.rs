//! Finds the target service declaration in a package and collects the
//! methods a [`MethodShape`] accepts.

use thiserror::Error;
use tracing::debug;

use crate::model::{Func, Package};
use crate::shape::MethodShape;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("No declaration named {declaration} in package {package}")]
    NotFound { declaration: String, package: String },

    #[error("Declaration {declaration} in package {package} has no RPC methods")]
    NoMethods { declaration: String, package: String },
}

/// Accepted methods of one receiver, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub receiver: String,
    pub methods: Vec<Func>,
}

/// Scan `package` for a named type called `target` and group the methods
/// `shape` accepts by receiver.
pub fn scan(
    package: &Package,
    target: &str,
    shape: &dyn MethodShape,
) -> Result<Vec<Service>, DiscoveryError> {
    let mut services: Vec<Service> = Vec::new();
    let mut found = false;

    for decl in package.types() {
        // aliases do not declare a new named type
        if decl.alias || decl.name != target {
            continue;
        }
        if services.iter().any(|s| s.receiver == decl.name) {
            continue;
        }
        found = true;

        let methods: Vec<Func> = package
            .methods_of(&decl.name)
            .filter(|m| shape.is_suitable(m))
            .cloned()
            .collect();

        debug!(
            package = %package.path,
            receiver = %decl.name,
            shape = shape.name(),
            accepted = methods.len(),
            "Scanned declaration"
        );

        if !methods.is_empty() {
            services.push(Service {
                receiver: decl.name.clone(),
                methods,
            });
        }
    }

    if !found {
        return Err(DiscoveryError::NotFound {
            declaration: target.to_string(),
            package: package.path.clone(),
        });
    }
    if services.is_empty() {
        return Err(DiscoveryError::NoMethods {
            declaration: target.to_string(),
            package: package.path.clone(),
        });
    }

    Ok(services)
}
