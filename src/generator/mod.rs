//! Client generation: resolves the types of accepted methods, renders the
//! client template and canonicalizes the result.

pub mod format;
pub mod resolver;
pub mod template;

pub use resolver::{Import, TypeNameResolver};

use thiserror::Error;
use tracing::{debug, error};

use crate::model::{Func, PackageRef, Type};
use crate::parser::ParseError;
use crate::shape::MethodShape;
use template::TemplateData;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Method {method} does not have the shape of an RPC method")]
    Unsuitable { method: String },

    #[error("Failed to render template: {0}")]
    Render(#[from] std::fmt::Error),

    /// `unformatted` holds the rendered text that failed to format
    #[error("Failed to format generated code: {reason}")]
    Format {
        #[source]
        reason: ParseError,
        unformatted: String,
    },
}

/// One method of the generated client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMethod {
    pub name: String,
    pub arg_type: String,
    pub reply_type: String,
}

/// The transport handle embedded in every generated client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Transport {
    /// A `<Service>Caller` interface declared in the generated file. Any
    /// value with `Call(serviceMethod string, args, reply interface{}) error`
    /// satisfies it, net/rpc's `*rpc.Client` included.
    #[default]
    Caller,
    /// A type from another package, e.g. `*rpc.Client` from net/rpc
    Named {
        package: PackageRef,
        type_name: String,
        pointer: bool,
    },
}

impl Transport {
    /// Parse a type spelled like `Client` or `*Client` from the package at `path`
    pub fn named(path: &str, type_name: &str) -> Self {
        let (pointer, type_name) = match type_name.strip_prefix('*') {
            Some(rest) => (true, rest),
            None => (false, type_name),
        };
        Transport::Named {
            package: PackageRef::from_path(path),
            type_name: type_name.to_string(),
            pointer,
        }
    }

    /// Name of the declared interface for `service`, if one is emitted
    pub fn caller_interface(&self, service: &str) -> Option<String> {
        match self {
            Transport::Caller => Some(format!("{}Caller", service)),
            Transport::Named { .. } => None,
        }
    }

    fn handle_type(&self, service: &str) -> Type {
        match self {
            Transport::Caller => Type::Named {
                name: format!("{}Caller", service),
                package: None,
            },
            Transport::Named {
                package,
                type_name,
                pointer,
            } => {
                let named = Type::named(type_name, package);
                if *pointer {
                    Type::pointer(named)
                } else {
                    named
                }
            }
        }
    }
}

/// Input for one generated file
#[derive(Debug, Clone, Copy)]
pub struct GenerateInput<'a> {
    pub package_name: &'a str,
    pub service: &'a str,
    pub methods: &'a [Func],
}

/// Renders client files for methods accepted by a shape
pub struct Generator<'a> {
    shape: &'a dyn MethodShape,
    transport: &'a Transport,
}

impl<'a> Generator<'a> {
    pub fn new(shape: &'a dyn MethodShape, transport: &'a Transport) -> Self {
        Self { shape, transport }
    }

    /// Generate the client source for `input`
    pub fn generate(&self, input: &GenerateInput<'_>) -> Result<Vec<u8>, GenerateError> {
        let mut resolver = TypeNameResolver::new();
        let transport_type = resolver.resolve(&self.transport.handle_type(input.service));

        let mut methods = Vec::with_capacity(input.methods.len());
        for func in input.methods {
            let unsuitable = || GenerateError::Unsuitable {
                method: func.name.clone(),
            };
            let arg = self.shape.arg_type(func).ok_or_else(unsuitable)?;
            let reply = self.shape.reply_type(func).ok_or_else(unsuitable)?;
            debug!(
                method = %func.name,
                arg = %arg.identifier,
                reply = %reply.identifier,
                imports = ?arg.imports.union(&reply.imports).collect::<Vec<_>>(),
                "Resolving method types"
            );

            methods.push(GeneratedMethod {
                name: func.name.clone(),
                arg_type: resolver.resolve(&arg.ty),
                reply_type: resolver.resolve(&reply.ty),
            });
        }

        let data = TemplateData {
            package: input.package_name.to_string(),
            service: input.service.to_string(),
            transport_type,
            caller_interface: self.transport.caller_interface(input.service),
            imports: resolver.imports(),
            methods,
        };

        let source = template::render(&data).map_err(|e| {
            error!("Failed to render template: {}", e);
            GenerateError::Render(e)
        })?;

        match format::canonicalize(&source) {
            Ok(formatted) => {
                debug!(
                    service = input.service,
                    methods = data.methods.len(),
                    imports = data.imports.len(),
                    "Generated client"
                );
                Ok(formatted.into_bytes())
            }
            Err(reason) => {
                error!("Failed to format code: {}\nCODE:\n{}", reason, source);
                Err(GenerateError::Format {
                    reason,
                    unformatted: source,
                })
            }
        }
    }
}
