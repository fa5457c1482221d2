//! Session configuration
//!
//! [`ConfigStore`] handles TOML, JSON and YAML files. [`SessionConfig`] is
//! what a test session needs: which backends to exercise, the process
//! timeout and the retry policy.

use std::fs;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use shellfs_process::{DEFAULT_TIMEOUT, ProcessInvoker};

use crate::backend::Backend;
use crate::ops::FileSystemOperations;
use crate::retry::{RetryPolicy, millis};
use crate::{Error, NormalizedPath, Result};

/// Comma-separated backend names, or `all`
pub const BACKENDS_VAR: &str = "SHELLFS_BACKENDS";
pub const TIMEOUT_VAR: &str = "SHELLFS_TIMEOUT_MS";
pub const RETRY_ATTEMPTS_VAR: &str = "SHELLFS_RETRY_ATTEMPTS";
pub const RETRY_DELAY_VAR: &str = "SHELLFS_RETRY_DELAY_MS";

/// Serialization formats [`ConfigStore`] understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
    Yaml,
}

impl Format {
    /// Pick the format from `path`'s extension, case-insensitively
    pub fn of(path: &NormalizedPath) -> Result<Self> {
        let extension = path.extension().unwrap_or("");
        match extension.to_ascii_lowercase().as_str() {
            "toml" => Ok(Format::Toml),
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Toml => "TOML",
            Format::Json => "JSON",
            Format::Yaml => "YAML",
        }
    }

    fn parse<T: DeserializeOwned>(self, text: &str) -> std::result::Result<T, String> {
        match self {
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
        }
    }

    fn render<T: Serialize>(self, value: &T) -> std::result::Result<String, String> {
        match self {
            Format::Toml => toml::to_string_pretty(value).map_err(|e| e.to_string()),
            Format::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        }
    }
}

/// Loads and saves any serde type in the [`Format`] named by the file
/// extension
#[derive(Debug, Default)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        let format = Format::of(path)?;
        let native = path.to_native();
        let text = fs::read_to_string(&native).map_err(|e| Error::io(&native, e))?;
        format.parse(&text).map_err(|message| Error::ConfigParse {
            path: native,
            format: format.name().into(),
            message,
        })
    }

    /// Write `value`, replacing the file in one rename so readers never
    /// see it half written
    pub fn save<T: Serialize>(&self, path: &NormalizedPath, value: &T) -> Result<()> {
        let format = Format::of(path)?;
        let native = path.to_native();
        let text = format.render(value).map_err(|message| Error::ConfigSerialize {
            path: native.clone(),
            format: format.name().into(),
            message,
        })?;

        let mut staging = native.clone().into_os_string();
        staging.push(format!(".{}.tmp", std::process::id()));
        let staging = std::path::PathBuf::from(staging);
        fs::write(&staging, text).map_err(|e| Error::io(&staging, e))?;
        fs::rename(&staging, &native).map_err(|e| Error::io(&native, e))
    }
}

/// Settings for one test session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Backends every cross-backend check runs against
    pub backends: Vec<Backend>,
    /// Timeout for each shell process
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backends: Backend::default_set(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Load from a `.toml`, `.json` or `.yaml` file; missing keys keep
    /// their defaults
    pub fn load(path: impl Into<NormalizedPath>) -> Result<Self> {
        ConfigStore::new().load(&path.into())
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Defaults overridden by `SHELLFS_*` entries in `vars`
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::default().with_vars(vars)
    }

    /// Apply `SHELLFS_*` overrides on top of this configuration
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                BACKENDS_VAR => self.backends = parse_backends(value)?,
                TIMEOUT_VAR => self.timeout = Duration::from_millis(parse_number(key, value)?),
                RETRY_ATTEMPTS_VAR => {
                    self.retry.max_attempts = parse_number(key, value)?
                        .try_into()
                        .map_err(|_| Error::ConfigValue {
                            key: key.into(),
                            message: format!("'{value}' is too large"),
                        })?;
                }
                RETRY_DELAY_VAR => {
                    self.retry.delay = Duration::from_millis(parse_number(key, value)?);
                }
                _ => continue,
            }
            tracing::debug!(key, value, "Applied configuration override");
        }
        Ok(self)
    }

    pub fn invoker(&self) -> ProcessInvoker {
        ProcessInvoker::with_timeout(self.timeout)
    }

    /// One façade per configured backend, in order
    pub fn file_systems(&self) -> Vec<FileSystemOperations> {
        self.backends
            .iter()
            .map(|&backend| FileSystemOperations::with_invoker(backend, self.invoker()))
            .collect()
    }
}

/// Parse `native,bash` style lists; `all` means every backend on this
/// platform
pub fn parse_backends(value: &str) -> Result<Vec<Backend>> {
    if value.trim().eq_ignore_ascii_case("all") {
        return Ok(Backend::all_for_platform());
    }
    let mut backends = Vec::new();
    for name in value.split(',').filter(|name| !name.trim().is_empty()) {
        let backend = name.parse::<Backend>()?;
        if !backends.contains(&backend) {
            backends.push(backend);
        }
    }
    if backends.is_empty() {
        return Err(Error::ConfigValue {
            key: BACKENDS_VAR.into(),
            message: "no backends listed".into(),
        });
    }
    Ok(backends)
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| Error::ConfigValue {
        key: key.into(),
        message: format!("'{value}' is not a whole number"),
    })
}
