//! Configuration management for llmgate
//!
//! Settings are layered: built-in defaults, then a YAML file, then
//! environment variables.
//!
//! # Environment Variables
//!
//! - `LLMGATE_HOST`: engine address - default: "localhost:8085"
//! - `LLMGATE_MODELS_DIR`: model storage directory - default: `<data dir>/llmgate/models`
//! - `LLMGATE_ENGINE_BIN`: engine executable - default: "llama-server" (looked up on `PATH`)
//! - `LLMGATE_DEFAULT_MODEL`: model used when none is named - default: "qwen2.5-0.5b"
//! - `LLMGATE_PROTOCOL`: engine wire protocol (completion|ollama|openai) - default: "completion"
//!
//! # Example
//!
//! ```no_run
//! use llmgate::GatewayConfig;
//!
//! let config = GatewayConfig::load(None).expect("Invalid configuration");
//! config.validate().expect("Invalid configuration");
//! println!("Engine at {}", config.endpoint());
//! ```

use crate::catalog::{CatalogEntry, HardwareProfile};
use crate::engine::EngineEndpoint;
use crate::protocol::{GenerationOptions, ProtocolKind};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default values for configuration
const DEFAULT_HOST: &str = "localhost:8085";
const DEFAULT_ENGINE_BIN: &str = "llama-server";
const DEFAULT_MODEL: &str = "qwen2.5-0.5b";
const DEFAULT_THREADS: u32 = 8;
const DEFAULT_CONTEXT_SIZE: u32 = 2048;
const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_PORT_RELEASE_MS: u64 = 1000;

const APP_DIR: &str = "llmgate";
const CONFIG_FILE: &str = "config.yaml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// Environment override with an unusable value
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// How the engine process is launched and watched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// `-t` passed to the engine
    pub threads: u32,
    /// `-c` passed to the engine
    pub context_size: u32,
    /// Bounded wait for the engine to answer its health probe
    pub startup_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Pause between stopping the old engine and starting the new one
    pub port_release_ms: u64,
    /// Address the engine binds to; defaults to the configured host
    pub bind_host: Option<String>,
    /// File receiving engine stdout/stderr; discarded when unset
    pub log_file: Option<PathBuf>,
    /// Appended verbatim to the engine command line
    pub extra_args: Vec<String>,
    /// Kill stray engines by binary name when no handle is held
    pub kill_orphans: bool,
}

impl EngineSettings {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn port_release_delay(&self) -> Duration {
        Duration::from_millis(self.port_release_ms)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            context_size: DEFAULT_CONTEXT_SIZE,
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            port_release_ms: DEFAULT_PORT_RELEASE_MS,
            bind_host: None,
            log_file: None,
            extra_args: Vec::new(),
            kill_orphans: true,
        }
    }
}

/// Main configuration structure for llmgate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Engine address, `host:port` or URL
    pub host: String,
    pub models_dir: PathBuf,
    pub engine_bin: PathBuf,
    pub default_model: String,
    pub protocol: ProtocolKind,
    pub engine: EngineSettings,
    pub generation: GenerationOptions,
    /// Host inventory supplied by an external detector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware: Option<HardwareProfile>,
    /// Entries appended to the built-in catalog
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub catalog: Vec<CatalogEntry>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            models_dir: default_models_dir(),
            engine_bin: PathBuf::from(DEFAULT_ENGINE_BIN),
            default_model: DEFAULT_MODEL.to_string(),
            protocol: ProtocolKind::default(),
            engine: EngineSettings::default(),
            generation: GenerationOptions::default(),
            hardware: None,
            catalog: Vec::new(),
        }
    }
}

/// `<data_local_dir>/llmgate/models`, or `./models` when the platform has none
pub fn default_models_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR).join("models"))
        .unwrap_or_else(|| PathBuf::from("models"))
}

/// `<config_dir>/llmgate/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
}

impl GatewayConfig {
    /// Loads defaults, then `path` (or the default config file when it
    /// exists), then environment overrides.
    ///
    /// An explicit `path` that cannot be read is an error; a missing
    /// default file is not.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Reads a YAML file; absent keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading configuration file");
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `LLMGATE_*` environment overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(host) = env_value("LLMGATE_HOST") {
            self.host = host;
        }
        if let Some(dir) = env_value("LLMGATE_MODELS_DIR") {
            self.models_dir = PathBuf::from(dir);
        }
        if let Some(bin) = env_value("LLMGATE_ENGINE_BIN") {
            self.engine_bin = PathBuf::from(bin);
        }
        if let Some(model) = env_value("LLMGATE_DEFAULT_MODEL") {
            self.default_model = model;
        }
        if let Some(protocol) = env_value("LLMGATE_PROTOCOL") {
            self.protocol = protocol
                .parse()
                .map_err(|message| ConfigError::InvalidValue {
                    field: "LLMGATE_PROTOCOL".to_string(),
                    message,
                })?;
        }
        Ok(())
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` for an empty host, port 0,
    /// zero threads or context size, or a zero startup timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Engine host must not be empty".to_string(),
            ));
        }
        if self.endpoint().port() == 0 {
            return Err(ConfigError::ValidationFailed(
                "Engine port must not be 0".to_string(),
            ));
        }
        if self.engine.threads == 0 {
            return Err(ConfigError::ValidationFailed(
                "Engine thread count must be at least 1".to_string(),
            ));
        }
        if self.engine.context_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "Engine context size must be at least 1".to_string(),
            ));
        }
        if self.engine.startup_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Engine startup timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Writes the configuration as YAML, creating the parent directory
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, yaml).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn endpoint(&self) -> EngineEndpoint {
        EngineEndpoint::parse(&self.host)
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
