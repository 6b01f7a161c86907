//! Builds a [`Program`] from a directory of Go sources.
//!
//! Loading happens in two passes. The first parses every file of every
//! requested package so that declared package names are known. The second
//! resolves type expressions against each file's imports.

use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::error::{LoadError, Result};
use super::{
    assumed_package_names, package_name_from_path, Func, Package, PackageRef, Param, Program,
    Receiver, Signature, SourceFile, Type, TypeDecl,
};
use crate::parser::{FileSyntax, GoParser, MethodSpec, ParamSpec, TypeExpr};

const BASIC_TYPES: &[&str] = &[
    "bool", "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16",
    "uint32", "uint64", "uintptr", "float32", "float64", "complex64", "complex128", "byte",
    "rune",
];

/// Module declared by the nearest `go.mod`
#[derive(Debug, Clone)]
struct Module {
    path: String,
    dir: PathBuf,
}

/// A package after the syntax pass
struct ParsedPackage {
    dir: PathBuf,
    reference: PackageRef,
    files: Vec<FileSyntax>,
}

/// Loads Go packages into the semantic model
pub struct Loader {
    parser: GoParser,
}

impl Loader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: GoParser::new()?,
        })
    }

    /// Load the package at `pattern`. A trailing `/...` loads every package
    /// below the directory instead.
    pub fn load(&mut self, pattern: &Path) -> Result<Program> {
        let (root, recursive) = split_pattern(pattern);
        if !root.is_dir() {
            return Err(LoadError::PathNotFound(root));
        }
        let root = root.canonicalize().map_err(|source| LoadError::Io {
            path: root.clone(),
            source,
        })?;

        let module = find_module(&root)?;
        match &module {
            Some(module) => debug!(module = %module.path, dir = %module.dir.display(), "Using go.mod"),
            None => debug!(root = %root.display(), "No go.mod found, deriving import paths from directories"),
        }

        let dirs = if recursive {
            package_dirs(&root)?
        } else {
            vec![root.clone()]
        };

        let mut parsed = Vec::new();
        for dir in dirs {
            let files = self.parse_dir(&dir)?;
            let Some(first) = files.first() else {
                if recursive {
                    continue;
                }
                return Err(LoadError::NoGoFiles(dir));
            };

            let name = first.package_name.clone();
            if let Some(other) = files.iter().find(|f| f.package_name != name) {
                return Err(LoadError::MixedPackages {
                    dir,
                    first: name,
                    second: other.package_name.clone(),
                });
            }

            let path = import_path(&dir, &root, module.as_ref());
            debug!(package = %name, path = %path, files = files.len(), "Parsed package");
            parsed.push(ParsedPackage {
                dir,
                reference: PackageRef::new(name, path),
                files,
            });
        }

        if parsed.is_empty() {
            return Err(LoadError::NoGoFiles(root));
        }

        let names: FxHashMap<String, String> = parsed
            .iter()
            .map(|p| (p.reference.path.clone(), p.reference.name.clone()))
            .collect();

        let packages: Vec<Package> = parsed
            .into_iter()
            .map(|p| resolve_package(p, &names))
            .collect();

        info!(packages = packages.len(), "Loaded Go sources");
        Ok(Program { packages })
    }

    fn parse_dir(&mut self, dir: &Path) -> Result<Vec<FileSyntax>> {
        let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LoadError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && is_go_source(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(self.parser.parse_file(&path)?);
        }
        Ok(files)
    }
}

fn is_go_source(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".go") && !name.ends_with("_test.go") && !name.starts_with('.')
}

fn split_pattern(pattern: &Path) -> (PathBuf, bool) {
    let text = pattern.to_string_lossy();
    if text == "..." {
        return (PathBuf::from("."), true);
    }
    match text.strip_suffix("/...") {
        Some("") => (PathBuf::from("/"), true),
        Some(prefix) => (PathBuf::from(prefix), true),
        None => (pattern.to_path_buf(), false),
    }
}

/// Directories below `root` that may hold packages, in lexical order
fn package_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e.file_name().to_str()));

    let mut dirs = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| LoadError::Io {
            path: root.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

fn is_skipped_dir(name: Option<&str>) -> bool {
    match name {
        Some(name) => {
            name.starts_with('.') || name.starts_with('_') || name == "vendor" || name == "testdata"
        }
        None => true,
    }
}

/// Find `go.mod` by searching upward from `start`
fn find_module(start: &Path) -> Result<Option<Module>> {
    for dir in start.ancestors() {
        let candidate = dir.join("go.mod");
        if !candidate.is_file() {
            continue;
        }

        let contents = fs::read_to_string(&candidate).map_err(|source| LoadError::Io {
            path: candidate.clone(),
            source,
        })?;
        match parse_module_path(&contents) {
            Some(path) => {
                return Ok(Some(Module {
                    path,
                    dir: dir.to_path_buf(),
                }))
            }
            None => warn!(file = %candidate.display(), "go.mod has no module directive"),
        }
    }
    Ok(None)
}

fn parse_module_path(contents: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.split("//").next()?.trim().trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    })
}

fn import_path(dir: &Path, root: &Path, module: Option<&Module>) -> String {
    let (base, relative) = match module {
        Some(module) => (
            module.path.clone(),
            dir.strip_prefix(&module.dir).unwrap_or(Path::new("")),
        ),
        None => {
            let base = root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "main".to_string());
            (base, dir.strip_prefix(root).unwrap_or(Path::new("")))
        }
    };

    let mut path = base;
    for component in relative.components() {
        path.push('/');
        path.push_str(&component.as_os_str().to_string_lossy());
    }
    path
}

fn resolve_package(parsed: ParsedPackage, names: &FxHashMap<String, String>) -> Package {
    let files = parsed
        .files
        .iter()
        .map(|file| {
            let scope = FileScope::new(&parsed.reference, file, names);
            SourceFile {
                path: file.path.clone(),
                types: file
                    .types
                    .iter()
                    .map(|spec| TypeDecl {
                        name: spec.name.clone(),
                        alias: spec.alias,
                        underlying: scope.resolve(&spec.ty),
                    })
                    .collect(),
                methods: file.methods.iter().map(|m| scope.method(m)).collect(),
            }
        })
        .collect();

    Package {
        name: parsed.reference.name.clone(),
        path: parsed.reference.path.clone(),
        dir: parsed.dir,
        files,
    }
}

/// Name resolution context of one file
struct FileScope<'a> {
    package: &'a PackageRef,
    /// Local qualifier to import path
    imports: FxHashMap<String, String>,
    /// Unaliased imports of packages that were not loaded
    unloaded: Vec<String>,
    names: &'a FxHashMap<String, String>,
}

impl<'a> FileScope<'a> {
    fn new(
        package: &'a PackageRef,
        file: &FileSyntax,
        names: &'a FxHashMap<String, String>,
    ) -> Self {
        let mut imports = FxHashMap::default();
        let mut unloaded = Vec::new();
        for import in &file.imports {
            let local = match import.alias.as_deref() {
                Some("_") | Some(".") => continue,
                Some(alias) => alias.to_string(),
                None => {
                    if !names.contains_key(&import.path) {
                        unloaded.push(import.path.clone());
                    }
                    declared_name(&import.path, names)
                }
            };
            imports.insert(local, import.path.clone());
        }
        Self {
            package,
            imports,
            unloaded,
            names,
        }
    }

    fn method(&self, spec: &MethodSpec) -> Func {
        Func {
            name: spec.name.clone(),
            package: self.package.clone(),
            receiver: Some(Receiver {
                type_name: spec.receiver.clone(),
                pointer: spec.pointer_receiver,
            }),
            signature: Signature {
                params: self.params(&spec.params),
                results: self.params(&spec.results),
                variadic: spec.variadic,
            },
        }
    }

    fn params(&self, specs: &[ParamSpec]) -> Vec<Param> {
        specs
            .iter()
            .map(|p| Param {
                name: p.name.clone(),
                ty: self.resolve(&p.ty),
            })
            .collect()
    }

    /// The package a qualifier refers to in this file
    fn qualifier(&self, qualifier: &str, name: &str) -> PackageRef {
        if let Some(path) = self.imports.get(qualifier) {
            return PackageRef::new(declared_name(path, self.names), path);
        }
        // `kafka.Message` with an import of "github.com/segmentio/kafka-go"
        if let Some(path) = self
            .unloaded
            .iter()
            .find(|path| assumed_package_names(path).iter().any(|n| n == qualifier))
        {
            return PackageRef::new(qualifier, path);
        }

        warn!(qualifier = %qualifier, name = %name, "Unknown package qualifier");
        PackageRef::new(qualifier, qualifier)
    }

    fn resolve(&self, expr: &TypeExpr) -> Type {
        match expr {
            TypeExpr::Ident(name) if BASIC_TYPES.contains(&name.as_str()) => Type::Basic(name.clone()),
            TypeExpr::Ident(name) if name == "error" => Type::error(),
            TypeExpr::Ident(name) if name == "any" => Type::Other(name.clone()),
            TypeExpr::Ident(name) => Type::named(name, self.package),
            TypeExpr::Qualified { package, name } => Type::Named {
                name: name.clone(),
                package: Some(self.qualifier(package, name)),
            },
            TypeExpr::Pointer(elem) => Type::Pointer(Box::new(self.resolve(elem))),
            TypeExpr::Slice(elem) => Type::Slice(Box::new(self.resolve(elem))),
            TypeExpr::Array { len, elem } => Type::Array {
                len: len.clone(),
                elem: Box::new(self.resolve(elem)),
            },
            TypeExpr::Map { key, value } => Type::Map {
                key: Box::new(self.resolve(key)),
                value: Box::new(self.resolve(value)),
            },
            TypeExpr::Other(text) => Type::Other(text.clone()),
        }
    }
}

/// Declared name of a loaded package, falling back to the path convention
fn declared_name(path: &str, names: &FxHashMap<String, String>) -> String {
    names
        .get(path)
        .cloned()
        .unwrap_or_else(|| package_name_from_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_split_pattern() {
        assert_eq!(split_pattern(Path::new("./app/...")), (PathBuf::from("./app"), true));
        assert_eq!(split_pattern(Path::new("...")), (PathBuf::from("."), true));
        assert_eq!(split_pattern(Path::new("./app")), (PathBuf::from("./app"), false));
    }

    #[test]
    fn test_parse_module_path() {
        assert_eq!(
            parse_module_path("// header\nmodule example.com/app // trailing\n\ngo 1.21\n"),
            Some("example.com/app".to_string())
        );
        assert_eq!(parse_module_path("modulename x\n"), None);
        assert_eq!(parse_module_path("go 1.21\n"), None);
    }

    #[test]
    fn test_load_resolves_types_against_imports() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        write(temp.path(), "go.mod", "module example.com/app\n\ngo 1.21\n");
        write(
            temp.path(),
            "models/item.go",
            "package domain\n\ntype Item struct{}\n",
        );
        write(
            temp.path(),
            "math/service.go",
            r#"package math

import (
    "net/http"
    "example.com/app/models"
    y "gopkg.in/yaml.v3"
)

type Service struct{}

func (s *Service) Sum(r *http.Request, arg []domain.Item, reply *y.Node) error {
    return nil
}
"#,
        );
        write(temp.path(), "math/service_test.go", "package math\n\nthis is not go\n");

        let program = Loader::new()?.load(&temp.path().join("..."))?;
        let paths: Vec<&str> = program.packages.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["example.com/app/math", "example.com/app/models"]);

        let math = &program.packages[0];
        assert_eq!(math.name, "math");
        assert_eq!(math.files.len(), 1);

        let sum = math.methods_of("Service").next().unwrap();
        let params: Vec<String> = sum
            .signature
            .params
            .iter()
            .map(|p| p.ty.to_string())
            .collect();
        assert_eq!(params, vec!["*http.Request", "[]domain.Item", "*yaml.Node"]);
        assert!(sum.signature.results[0].ty.is_error());

        match &sum.signature.params[1].ty {
            Type::Slice(elem) => assert_eq!(
                **elem,
                Type::named("Item", &PackageRef::new("domain", "example.com/app/models"))
            ),
            other => panic!("unexpected type {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_qualifiers_of_non_identifier_import_paths() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        write(temp.path(), "go.mod", "module example.com/app\n\ngo 1.21\n");
        write(
            temp.path(),
            "bus/service.go",
            r#"package bus

import (
    "github.com/patrickmn/go-cache"
    "github.com/satori/go.uuid"
    "github.com/segmentio/kafka-go"
)

type Service struct{}

func (s *Service) Publish(args kafka.Message, reply *uuid.UUID) error {
    return nil
}

func (s *Service) Cache(args cache.Item, reply *missing.Thing) error {
    return nil
}
"#,
        );

        let program = Loader::new()?.load(&temp.path().join("bus"))?;
        let bus = &program.packages[0];
        let packages: Vec<Option<PackageRef>> = bus
            .methods_of("Service")
            .flat_map(|m| m.signature.params.iter())
            .map(|p| match p.ty.strip_pointer() {
                Type::Named { package, .. } => package.clone(),
                other => panic!("unexpected type {:?}", other),
            })
            .collect();

        assert_eq!(
            packages,
            vec![
                Some(PackageRef::new("kafka", "github.com/segmentio/kafka-go")),
                Some(PackageRef::new("uuid", "github.com/satori/go.uuid")),
                Some(PackageRef::new("cache", "github.com/patrickmn/go-cache")),
                Some(PackageRef::new("missing", "missing")),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_load_without_go_mod_uses_directory_names() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path().join("app");
        write(&root, "service.go", "package app\n\ntype Service struct{}\n");

        let program = Loader::new()?.load(&root)?;
        assert_eq!(program.packages.len(), 1);
        assert_eq!(program.packages[0].path, "app");
        assert_eq!(program.packages[0].types().count(), 1);
        Ok(())
    }

    #[test]
    fn test_load_errors() -> anyhow::Result<()> {
        let temp = TempDir::new()?;

        let missing = Loader::new()?.load(&temp.path().join("missing"));
        assert!(matches!(missing, Err(LoadError::PathNotFound(_))));

        let empty = Loader::new()?.load(temp.path());
        assert!(matches!(empty, Err(LoadError::NoGoFiles(_))));

        write(temp.path(), "a.go", "package a\n");
        write(temp.path(), "b.go", "package b\n");
        let mixed = Loader::new()?.load(temp.path());
        assert!(matches!(mixed, Err(LoadError::MixedPackages { .. })));
        Ok(())
    }
}
