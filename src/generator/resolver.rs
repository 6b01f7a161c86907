//! Assigns collision-free import qualifiers to the types of one generated
//! file.
//!
//! For a given short package name the first package path keeps the bare
//! name. Later distinct paths with the same short name become `name1`,
//! `name2`, ... in order of first appearance:
//!
//! ```text
//! mypackage  "github.com/x/mypackage"
//! mypackage1 "github.com/y/mypackage"
//! mypackage2 "github.com/z/mypackage"
//! ```

use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::{strip_vendor, PackageRef, Type};

/// One line of the rendered import block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// `None` when the package is imported under its own name
    pub alias: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMapping {
    pub alias: String,
    /// Number of distinct paths registered under the short name before this one
    pub index: usize,
}

/// Resolves type names for a single generated file. Not shared between files.
#[derive(Debug, Default)]
pub struct TypeNameResolver {
    /// short name -> (path, mapping) in first-seen order
    by_name: FxHashMap<String, Vec<(String, ImportMapping)>>,
    /// (short name, path) in first-seen order
    order: Vec<(String, String)>,
    taken: FxHashSet<String>,
}

impl TypeNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print `ty` in Go syntax with every qualifier rewritten to its alias
    pub fn resolve(&mut self, ty: &Type) -> String {
        ty.print(&mut |package: &PackageRef| self.qualifier(package))
    }

    /// Register a package up front so it keeps its bare name, and return the
    /// qualifier to use for it.
    pub fn reserve(&mut self, package: &PackageRef) -> String {
        self.qualifier(package)
    }

    fn qualifier(&mut self, package: &PackageRef) -> String {
        let name = package.name.as_str();
        let path = strip_vendor(&package.path);

        let paths = self.by_name.entry(name.to_string()).or_default();
        if let Some((_, mapping)) = paths.iter().find(|(p, _)| *p == path) {
            return mapping.alias.clone();
        }

        let index = paths.len();
        let mut alias = if index == 0 {
            name.to_string()
        } else {
            format!("{}{}", name, index)
        };
        // a package may itself be called `name1`
        let mut suffix = index.max(1);
        while self.taken.contains(&alias) {
            alias = format!("{}{}", name, suffix);
            suffix += 1;
        }

        paths.push((
            path.clone(),
            ImportMapping {
                alias: alias.clone(),
                index,
            },
        ));
        self.taken.insert(alias.clone());
        self.order.push((name.to_string(), path));
        alias
    }

    /// The mapping registered for a (short name, path) pair
    pub fn mapping(&self, name: &str, path: &str) -> Option<&ImportMapping> {
        self.by_name
            .get(name)?
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, mapping)| mapping)
    }

    /// Imports in first-seen order
    pub fn imports(&self) -> Vec<Import> {
        self.order
            .iter()
            .filter_map(|(name, path)| {
                let mapping = self.mapping(name, path)?;
                Some(Import {
                    alias: (mapping.alias != *name).then(|| mapping.alias.clone()),
                    path: path.clone(),
                })
            })
            .collect()
    }
}
