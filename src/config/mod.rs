pub mod error;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::generator::Transport;
use crate::model::is_exported;
use crate::shape::Convention;
use error::{ConfigError, Result};

pub const CONFIG_FILE: &str = "rpcglue.toml";

const DEFAULT_OUT: &str = "./client";
const DEFAULT_PACKAGE: &str = "client";

/// Settings from `rpcglue.toml`, later overlaid with command-line flags
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name of the service declaration to scan for (required)
    pub name: Option<String>,

    /// Name of the generated client type (required)
    pub service: Option<String>,

    /// Output directory for generated files
    pub out: Option<PathBuf>,

    /// Package clause of generated files
    pub package: Option<String>,

    /// Calling convention: "plain" or "gorilla"
    pub convention: Option<Convention>,

    /// Import path of the transport package
    pub transport: Option<String>,

    /// Transport handle type, e.g. `*Client`
    pub transport_type: Option<String>,

    /// Log level: error, warn, info, debug, trace
    pub log_level: Option<String>,
}

impl Config {
    /// Load `rpcglue.toml` from `dir` or the nearest parent that has one.
    /// No file at all yields an empty config.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let Some(config_path) = find_config_file(dir.as_ref()) else {
            debug!(dir = %dir.as_ref().display(), "No {} found", CONFIG_FILE);
            return Ok(Self::default());
        };

        let data = fs::read_to_string(&config_path).map_err(|source| ConfigError::ReadFailed {
            path: config_path.clone(),
            source,
        })?;
        let mut config: Config =
            toml::from_str(&data).map_err(|source| ConfigError::ParseFailed {
                path: config_path.clone(),
                source,
            })?;

        // relative output paths are relative to the config file
        let config_dir = config_path.parent().unwrap_or(Path::new("."));
        config.normalize_paths(config_dir);

        debug!(path = %config_path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Overlay `other` on top of `self`; set fields in `other` win
    pub fn merge(self, other: Config) -> Config {
        Config {
            name: other.name.or(self.name),
            service: other.service.or(self.service),
            out: other.out.or(self.out),
            package: other.package.or(self.package),
            convention: other.convention.or(self.convention),
            transport: other.transport.or(self.transport),
            transport_type: other.transport_type.or(self.transport_type),
            log_level: other.log_level.or(self.log_level),
        }
    }

    /// Check that the merged settings can drive a run
    pub fn validate(&self) -> Result<()> {
        match self.name.as_deref() {
            None | Some("") => return Err(ConfigError::MissingField("name")),
            Some(_) => {}
        }
        match self.service.as_deref() {
            None | Some("") => return Err(ConfigError::MissingField("service")),
            Some(service) if !is_identifier(service) => {
                return Err(ConfigError::Invalid(format!(
                    "service '{}' is not a Go identifier",
                    service
                )))
            }
            Some(_) => {}
        }
        if !is_identifier(self.package_name()) {
            return Err(ConfigError::Invalid(format!(
                "package '{}' is not a Go identifier",
                self.package_name()
            )));
        }
        if self.transport_type.is_some() && self.transport.is_none() {
            return Err(ConfigError::Invalid(
                "transport_type requires transport".to_string(),
            ));
        }
        if let Some(type_name) = &self.transport_type {
            let bare = type_name.strip_prefix('*').unwrap_or(type_name);
            if !is_exported(bare) || !is_identifier(bare) {
                return Err(ConfigError::Invalid(format!(
                    "transport_type '{}' is not an exported type name",
                    type_name
                )));
            }
        }
        Ok(())
    }

    pub fn out_dir(&self) -> PathBuf {
        self.out
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT))
    }

    pub fn package_name(&self) -> &str {
        self.package.as_deref().unwrap_or(DEFAULT_PACKAGE)
    }

    pub fn convention(&self) -> Convention {
        self.convention.unwrap_or_default()
    }

    /// Transport handle for generated clients. Without a transport package
    /// each file declares its own caller interface; with one the type
    /// defaults to `*Client`.
    pub fn transport(&self) -> Transport {
        match &self.transport {
            Some(path) => Transport::named(path, self.transport_type.as_deref().unwrap_or("*Client")),
            None => Transport::default(),
        }
    }

    fn normalize_paths(&mut self, config_dir: &Path) {
        if let Some(out) = &self.out {
            if out.is_relative() {
                self.out = Some(config_dir.join(out));
            }
        }
    }
}

/// Find `rpcglue.toml` by searching upward from the given path
fn find_config_file(start_path: &Path) -> Option<PathBuf> {
    let start = if start_path.is_file() {
        start_path.parent()?
    } else {
        start_path
    };
    let mut current = start.canonicalize().ok()?;

    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PackageRef;
    use tempfile::TempDir;

    fn required() -> Config {
        Config {
            name: Some("Service".to_string()),
            service: Some("Math".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(temp_dir.path()).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.package_name(), "client");
        assert_eq!(config.out_dir(), PathBuf::from("./client"));
        assert_eq!(config.convention(), Convention::Plain);
        assert_eq!(config.transport(), Transport::default());
    }

    #[test]
    fn test_load_from_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE),
            "name = \"Service\"\nservice = \"Math\"\nout = \"gen\"\nconvention = \"gorilla\"\n",
        )
        .unwrap();
        let sub_dir = temp_dir.path().join("svc");
        fs::create_dir(&sub_dir).unwrap();

        let config = Config::load(&sub_dir).unwrap();
        assert_eq!(config.name.as_deref(), Some("Service"));
        assert_eq!(config.convention(), Convention::Gorilla);
        assert_eq!(
            config.out_dir(),
            temp_dir.path().canonicalize().unwrap().join("gen")
        );
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE), "name = ").unwrap();
        assert!(matches!(
            Config::load(temp_dir.path()),
            Err(ConfigError::ParseFailed { .. })
        ));

        fs::write(temp_dir.path().join(CONFIG_FILE), "convention = \"grpc\"").unwrap();
        assert!(matches!(
            Config::load(temp_dir.path()),
            Err(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn test_flags_override_file() {
        let file = Config {
            name: Some("FromFile".to_string()),
            package: Some("filepkg".to_string()),
            ..Config::default()
        };
        let flags = Config {
            name: Some("FromFlag".to_string()),
            ..Config::default()
        };

        let merged = file.merge(flags);
        assert_eq!(merged.name.as_deref(), Some("FromFlag"));
        assert_eq!(merged.package_name(), "filepkg");
    }

    #[test]
    fn test_validation() {
        assert!(required().validate().is_ok());

        let mut config = required();
        config.name = None;
        assert!(matches!(config.validate(), Err(ConfigError::MissingField("name"))));

        let mut config = required();
        config.service = Some(String::new());
        assert!(matches!(config.validate(), Err(ConfigError::MissingField("service"))));

        let mut config = required();
        config.package = Some("my-client".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = required();
        config.transport_type = Some("*Conn".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_custom_transport() {
        let mut config = required();
        config.transport = Some("example.com/rpc/client".to_string());
        assert_eq!(
            config.transport(),
            Transport::Named {
                package: PackageRef::new("client", "example.com/rpc/client"),
                type_name: "Client".to_string(),
                pointer: true,
            }
        );

        config.transport_type = Some("Caller".to_string());
        assert!(matches!(
            config.transport(),
            Transport::Named { pointer: false, .. }
        ));

        assert_eq!(required().transport(), Transport::Caller);
    }
}
