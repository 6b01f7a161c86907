//! The orchestrator: loads the Go sources, then turns every initial package
//! into a client file in parallel.

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span};

use crate::config::error::ConfigError;
use crate::core::metrics::Timer;
use crate::core::{GlueError, Result, UnitFailure};
use crate::generator::{GenerateInput, Generator, Transport};
use crate::model::loader::Loader;
use crate::model::{Package, Program};
use crate::scanner;
use crate::shape::MethodShape;
use crate::time_operation;
use crate::writer::Sink;

/// Where to look and what to look for in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directions {
    /// Package directory, or a directory followed by `/...`
    pub path: PathBuf,
    /// Name of the service declaration, e.g. `MathService`
    pub name: String,
    /// Service name used in method keys, e.g. `Math` in `Math.Sum`
    pub service: String,
}

impl Directions {
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        service: impl Into<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let path = path.into();
        let name = name.into();
        let service = service.into();

        if path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("path"));
        }
        if name.is_empty() {
            return Err(ConfigError::MissingField("name"));
        }
        if service.is_empty() {
            return Err(ConfigError::MissingField("service"));
        }

        Ok(Self {
            path,
            name,
            service,
        })
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Names of the files handed to the sink, sorted
    pub files: Vec<String>,
}

/// `generated_<Service>Client.go`
pub fn client_file_name(service: &str) -> String {
    format!("generated_{}Client.go", service)
}

/// Walks along [`Directions`] and generates clients into a [`Sink`]
pub struct Walker {
    shape: Arc<dyn MethodShape>,
    sink: Arc<dyn Sink>,
    package_name: String,
    transport: Transport,
}

impl Walker {
    pub fn new(shape: Box<dyn MethodShape>, sink: Arc<dyn Sink>) -> Self {
        Self {
            shape: Arc::from(shape),
            sink,
            package_name: "client".to_string(),
            transport: Transport::default(),
        }
    }

    /// Package clause of generated files
    pub fn with_package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = package_name.into();
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Load the sources and process every package. Units run to completion
    /// even when a sibling fails; all failures are reported together.
    pub async fn run(&self, directions: &Directions) -> Result<RunReport> {
        let timer = Timer::start("generate clients");

        let program = load(directions.path.clone()).await?;
        let program = Arc::new(program);

        let unit = Arc::new(Unit {
            shape: Arc::clone(&self.shape),
            sink: Arc::clone(&self.sink),
            package_name: self.package_name.clone(),
            transport: self.transport.clone(),
            name: directions.name.clone(),
            service: directions.service.clone(),
        });

        let mut pending: FxHashSet<String> = FxHashSet::default();
        let mut tasks = JoinSet::new();
        for index in 0..program.packages.len() {
            pending.insert(program.packages[index].path.clone());
            let program = Arc::clone(&program);
            let unit = Arc::clone(&unit);
            tasks.spawn_blocking(move || {
                let package = &program.packages[index];
                (package.path.clone(), unit.process(package))
            });
        }

        let mut files = Vec::new();
        let mut failures = Vec::new();
        let mut aborted = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((package, Ok(written))) => {
                    pending.remove(&package);
                    files.extend(written);
                }
                Ok((package, Err(err))) => {
                    pending.remove(&package);
                    error!(package = %package, error = %err, "Package failed");
                    failures.push(UnitFailure {
                        package,
                        error: err,
                    });
                }
                Err(join_err) => aborted.push(join_err.to_string()),
            }
        }

        // a panicked unit never reports its package, so pair leftovers up
        let mut pending: Vec<String> = pending.into_iter().collect();
        pending.sort();
        for (package, reason) in pending.into_iter().zip(aborted) {
            error!(package = %package, error = %reason, "Package task aborted");
            failures.push(UnitFailure {
                package,
                error: GlueError::Join(reason),
            });
        }

        timer.stop();

        if !failures.is_empty() {
            failures.sort_by(|a, b| a.package.cmp(&b.package));
            return Err(GlueError::Units(failures));
        }

        files.sort();
        info!(files = files.len(), "Generated clients");
        Ok(RunReport { files })
    }
}

async fn load(path: PathBuf) -> Result<Program> {
    let loaded = tokio::task::spawn_blocking(move || {
        time_operation!("load sources", {
            Loader::new().and_then(|mut loader| loader.load(&path))
        })
    })
    .await
    .map_err(|e| GlueError::Join(e.to_string()))?;

    Ok(loaded?)
}

/// Settings shared by every package unit
struct Unit {
    shape: Arc<dyn MethodShape>,
    sink: Arc<dyn Sink>,
    package_name: String,
    transport: Transport,
    name: String,
    service: String,
}

impl Unit {
    /// Scan one package and write a client for every receiver found
    fn process(&self, package: &Package) -> Result<Vec<String>> {
        let span = info_span!("unit", package = %package.path);
        let _entered = span.enter();
        let timer = Timer::start_debug(format!("package {}", package.path));

        let services = scanner::scan(package, &self.name, self.shape.as_ref())?;
        let generator = Generator::new(self.shape.as_ref(), &self.transport);
        let file = client_file_name(&self.service);

        let mut written = Vec::with_capacity(services.len());
        for service in &services {
            debug!(
                receiver = %service.receiver,
                methods = service.methods.len(),
                "Generating client"
            );
            let source = generator.generate(&GenerateInput {
                package_name: &self.package_name,
                service: &self.service,
                methods: &service.methods,
            })?;
            self.sink.write(&file, &source)?;
            written.push(file.clone());
        }

        timer.stop();
        Ok(written)
    }
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("shape", &self.shape.name())
            .field("package_name", &self.package_name)
            .field("transport", &self.transport)
            .finish()
    }
}
