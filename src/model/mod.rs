//! Read-only semantic model of the loaded Go packages.
//!
//! The model carries exactly what service discovery needs: package identity,
//! declared types with their exported status, and method sets with resolved
//! parameter and result types. It is built once by [`Loader`] and shared
//! between workers without mutation.

pub mod error;
pub mod loader;

pub use error::LoadError;
pub use loader::Loader;

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Identity of a Go package: its declared name and canonical import path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageRef {
    pub name: String,
    pub path: String,
}

impl PackageRef {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Derive the conventional package name from an import path
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: package_name_from_path(&path),
            path,
        }
    }
}

/// A resolved Go type expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// Predeclared numeric, string and boolean types
    Basic(String),
    /// A declared type. `package` is `None` for universe types such as `error`.
    Named {
        name: String,
        package: Option<PackageRef>,
    },
    Pointer(Box<Type>),
    Slice(Box<Type>),
    Array { len: String, elem: Box<Type> },
    Map { key: Box<Type>, value: Box<Type> },
    /// Literal types the generator never looks inside, kept as source text
    Other(String),
}

impl Type {
    pub fn basic(name: &str) -> Self {
        Type::Basic(name.to_string())
    }

    pub fn named(name: &str, package: &PackageRef) -> Self {
        Type::Named {
            name: name.to_string(),
            package: Some(package.clone()),
        }
    }

    pub fn error() -> Self {
        Type::Named {
            name: "error".to_string(),
            package: None,
        }
    }

    pub fn pointer(elem: Type) -> Self {
        Type::Pointer(Box::new(elem))
    }

    pub fn slice(elem: Type) -> Self {
        Type::Slice(Box::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Named { name, package: None } if name == "error")
    }

    /// Remove one top-level pointer, if present
    pub fn strip_pointer(&self) -> &Type {
        match self {
            Type::Pointer(elem) => elem,
            other => other,
        }
    }

    /// Print the type in Go syntax, asking `qualify` for every package
    /// qualifier. An empty qualifier prints the bare type name.
    pub fn print<F>(&self, qualify: &mut F) -> String
    where
        F: FnMut(&PackageRef) -> String,
    {
        match self {
            Type::Basic(name) | Type::Other(name) => name.clone(),
            Type::Named {
                name,
                package: Some(package),
            } => {
                let qualifier = qualify(package);
                if qualifier.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", qualifier, name)
                }
            }
            Type::Named { name, package: None } => name.clone(),
            Type::Pointer(elem) => format!("*{}", elem.print(qualify)),
            Type::Slice(elem) => format!("[]{}", elem.print(qualify)),
            Type::Array { len, elem } => format!("[{}]{}", len, elem.print(qualify)),
            Type::Map { key, value } => {
                let key = key.print(qualify);
                let value = value.print(qualify);
                format!("map[{}]{}", key, value)
            }
        }
    }

    /// Every package referenced by the type, in first-seen order
    pub fn packages(&self) -> Vec<&PackageRef> {
        let mut out = Vec::new();
        self.collect_packages(&mut out);
        out
    }

    fn collect_packages<'a>(&'a self, out: &mut Vec<&'a PackageRef>) {
        match self {
            Type::Named {
                package: Some(package),
                ..
            } => {
                if !out.contains(&package) {
                    out.push(package);
                }
            }
            Type::Pointer(elem) | Type::Slice(elem) | Type::Array { elem, .. } => {
                elem.collect_packages(out)
            }
            Type::Map { key, value } => {
                key.collect_packages(out);
                value.collect_packages(out);
            }
            Type::Basic(_) | Type::Named { package: None, .. } | Type::Other(_) => {}
        }
    }

    /// Vendor-stripped import paths referenced by the type
    pub fn import_paths(&self) -> BTreeSet<String> {
        self.packages()
            .into_iter()
            .map(|p| strip_vendor(&p.path))
            .collect()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print(&mut |package: &PackageRef| package.name.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Option<String>,
    pub ty: Type,
}

impl Param {
    pub fn unnamed(ty: Type) -> Self {
        Self { name: None, ty }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    pub type_name: String,
    pub pointer: bool,
}

/// A method declared on a named type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Func {
    pub name: String,
    pub package: PackageRef,
    pub receiver: Option<Receiver>,
    pub signature: Signature,
}

impl Func {
    /// Build a pointer-receiver method from bare parameter and result types
    pub fn method(
        package: &PackageRef,
        receiver: &str,
        name: &str,
        params: Vec<Type>,
        results: Vec<Type>,
    ) -> Self {
        Self {
            name: name.to_string(),
            package: package.clone(),
            receiver: Some(Receiver {
                type_name: receiver.to_string(),
                pointer: true,
            }),
            signature: Signature {
                params: params.into_iter().map(Param::unnamed).collect(),
                results: results.into_iter().map(Param::unnamed).collect(),
                variadic: false,
            },
        }
    }

    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }

    pub fn receiver_name(&self) -> Option<&str> {
        self.receiver.as_ref().map(|r| r.type_name.as_str())
    }
}

/// `type Name T` (or an alias when `alias` is set)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub alias: bool,
    pub underlying: Type,
}

impl TypeDecl {
    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    pub path: PathBuf,
    pub types: Vec<TypeDecl>,
    pub methods: Vec<Func>,
}

/// One loaded Go package
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub path: String,
    pub dir: PathBuf,
    pub files: Vec<SourceFile>,
}

impl Package {
    pub fn reference(&self) -> PackageRef {
        PackageRef::new(&self.name, &self.path)
    }

    /// All type declarations in file order
    pub fn types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.files.iter().flat_map(|f| f.types.iter())
    }

    /// Methods whose receiver base type is `type_name`, by value or pointer,
    /// in file then source order.
    pub fn methods_of<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Func> + 'a {
        self.files
            .iter()
            .flat_map(|f| f.methods.iter())
            .filter(move |m| m.receiver_name() == Some(type_name))
    }
}

/// The initial packages of one load
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub packages: Vec<Package>,
}

/// Go's export rule: the first character is an upper-case letter
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// `github.com/x/y/vendor/github.com/a/b` becomes `github.com/a/b`.
/// The cut happens after the last `vendor` segment.
pub fn strip_vendor(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    match segments.iter().rposition(|s| *s == "vendor") {
        Some(index) => segments[index + 1..].join("/"),
        None => path.to_string(),
    }
}

/// Best-effort package name for an import path that was not loaded:
/// `example.com/lib/v2` is `lib`, `gopkg.in/yaml.v3` is `yaml`.
pub fn package_name_from_path(path: &str) -> String {
    let mut segments = path.trim_end_matches('/').rsplit('/');
    let last = segments.next().unwrap_or(path);

    let last = if is_major_version(last) {
        segments.next().unwrap_or(last)
    } else {
        last
    };

    match last.rfind(".v") {
        Some(index) if last[index + 2..].chars().all(|c| c.is_ascii_digit()) && index + 2 < last.len() => {
            last[..index].to_string()
        }
        _ => last.to_string(),
    }
}

/// Names an unaliased import of `path` may be referred to by when the last
/// path element is not an identifier. The first entry is the name goimports
/// assumes (`go-` dropped, cut at the first non-identifier character); the
/// second also drops a `go.` prefix and a `-go` or `.go` suffix.
///
/// `kafka-go` gives `kafka`, `go-redis` gives `redis`, `go.uuid` gives `go`
/// and `uuid`.
pub fn assumed_package_names(path: &str) -> Vec<String> {
    let mut segments = path.trim_end_matches('/').rsplit('/');
    let mut base = segments.next().unwrap_or(path);
    if is_major_version(base) {
        base = segments.next().unwrap_or(base);
    }

    let goimports = cut_identifier(base.strip_prefix("go-").unwrap_or(base));

    let trimmed = base
        .strip_prefix("go-")
        .or_else(|| base.strip_prefix("go."))
        .unwrap_or(base);
    let trimmed = trimmed
        .strip_suffix("-go")
        .or_else(|| trimmed.strip_suffix(".go"))
        .unwrap_or(trimmed);
    let trimmed = cut_identifier(trimmed);

    let mut names = Vec::with_capacity(2);
    for name in [goimports, trimmed] {
        if !name.is_empty() && !names.iter().any(|n: &String| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn cut_identifier(s: &str) -> &str {
    match s.find(|c: char| !(c.is_alphanumeric() || c == '_')) {
        Some(index) => &s[..index],
        None => s,
    }
}

fn is_major_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}
