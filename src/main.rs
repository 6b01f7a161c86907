use rpcglue::config::Config;
use rpcglue::shape::Convention;
use rpcglue::walker::{Directions, Walker};
use rpcglue::writer::{FileSink, Sink, StdoutSink};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// rpcglue - generate typed Go clients for net/rpc services
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Name of the RPC declaration, e.g. `MathService`
    #[arg(long)]
    name: Option<String>,

    /// Name of the RPC service, e.g. `Math` in `Math.Sum`
    #[arg(long)]
    service: Option<String>,

    /// Output directory [default: ./client]
    #[arg(long, conflicts_with = "print")]
    out: Option<PathBuf>,

    /// Print generated code to stdout instead of writing files
    #[arg(long)]
    print: bool,

    /// Use the gorilla/rpc convention (leading *http.Request parameter)
    #[arg(long)]
    gorilla: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Package clause of generated files [default: client]
    #[arg(long)]
    package: Option<String>,

    /// Import path of the transport package [default: a declared caller interface]
    #[arg(long)]
    transport: Option<String>,

    /// Transport handle type [default: *Client]
    #[arg(long)]
    transport_type: Option<String>,

    /// Config directory (contains rpcglue.toml)
    #[arg(long, short = 'c', default_value = ".")]
    config: PathBuf,

    /// Go package directory; append `/...` to include subpackages
    #[arg(default_value = ".")]
    path: PathBuf,
}

impl Args {
    /// Flag values as a config layer
    fn overrides(&self) -> Config {
        Config {
            name: self.name.clone(),
            service: self.service.clone(),
            out: self.out.clone(),
            package: self.package.clone(),
            convention: self.gorilla.then_some(Convention::Gorilla),
            transport: self.transport.clone(),
            transport_type: self.transport_type.clone(),
            log_level: self.debug.then(|| "debug".to_string()),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(file) => file.merge(args.overrides()),
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::from(1);
        }
    };

    init_logging(config.log_level.as_deref());

    let walker = match setup(&args, &config) {
        Ok(setup) => setup,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            return ExitCode::from(1);
        }
    };

    match run(walker) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

/// Install the global subscriber. RUST_LOG wins over `level`, which wins
/// over the default of "warn".
fn init_logging(level: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("warn")));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {}", err);
    }
}

fn setup(args: &Args, config: &Config) -> Result<(Walker, Directions)> {
    config.validate()?;

    let directions = Directions::new(
        args.path.clone(),
        config.name.clone().unwrap_or_default(),
        config.service.clone().unwrap_or_default(),
    )?;

    let sink: Arc<dyn Sink> = if args.print {
        Arc::new(StdoutSink)
    } else {
        let dir = config.out_dir();
        info!("Writing clients to: {}", dir.display());
        Arc::new(
            FileSink::new(&dir)
                .with_context(|| format!("Failed to prepare {}", dir.display()))?,
        )
    };

    let walker = Walker::new(config.convention().shape(), sink)
        .with_package_name(config.package_name())
        .with_transport(config.transport());

    Ok((walker, directions))
}

fn run((walker, directions): (Walker, Directions)) -> Result<()> {
    info!(
        path = %directions.path.display(),
        declaration = %directions.name,
        service = %directions.service,
        "Generating clients"
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    let report = runtime.block_on(walker.run(&directions))?;

    info!(files = ?report.files, "Done");
    Ok(())
}
