//! Run configuration and the `changelog.toml` manifest.
//!
//! A manifest carries the database configuration and the ordered list of
//! changesets to apply:
//!
//! ```toml
//! [database]
//! connection_uri = "${REDIS_URL}"
//! database_name = "app"
//!
//! [database.connection_options]
//! response_timeout_ms = 500
//!
//! [[changesets]]
//! name = "initDB"
//!
//! [[changesets]]
//! name = "addAppAdminUsers"
//! enabled = false
//! ```
//!
//! Values of the form `${VAR}` are expanded from the environment when the
//! manifest is loaded. An unset variable expands to an empty string, which the
//! validator then rejects.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ChangelogError;

/// Default manifest file name looked up by the CLI.
pub const DEFAULT_MANIFEST: &str = "changelog.toml";

/// Connection settings for a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default = "default_connection_uri")]
    pub connection_uri: String,
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub connection_options: Option<ConnectionOptions>,
}

impl Configuration {
    /// Build a configuration with default connection options.
    pub fn new(connection_uri: impl Into<String>, database_name: impl Into<String>) -> Self {
        Self {
            connection_uri: connection_uri.into(),
            database_name: database_name.into(),
            connection_options: Some(ConnectionOptions::default()),
        }
    }

    pub fn with_connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = Some(options);
        self
    }

    fn expand_env(&mut self) {
        self.connection_uri = expand_env_vars(&self.connection_uri);
        self.database_name = expand_env_vars(&self.database_name);
    }
}

/// Store connection options.
///
/// The recognised keys tune the Redis connection manager; any other key is
/// carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_retries: Option<usize>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ConnectionOptions {
    pub fn connection_timeout(&self) -> Option<Duration> {
        self.connection_timeout_ms.map(Duration::from_millis)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }
}

/// One entry of the manifest's ordered changeset list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangesetRef {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ChangesetRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }

    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
        }
    }
}

/// Parsed `changelog.toml`.
///
/// Both sections are optional at parse time so that a malformed manifest is
/// reported through the same validation errors as a programmatic call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub database: Option<Configuration>,
    #[serde(default)]
    pub changesets: Option<Vec<ChangesetRef>>,
    /// Overrides the changelog collection name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, ChangelogError> {
        let content = std::fs::read_to_string(path).map_err(|err| ChangelogError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::parse(&content).map_err(|message| ChangelogError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse manifest text, expanding `${VAR}` references.
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut manifest: Manifest = toml::from_str(content).map_err(|err| err.to_string())?;
        if let Some(database) = manifest.database.as_mut() {
            database.expand_env();
        }
        Ok(manifest)
    }

    /// Resolve the manifest path from an explicit value or the working directory.
    pub fn locate(explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(DEFAULT_MANIFEST),
        }
    }
}

fn default_connection_uri() -> String {
    "${REDIS_URL}".to_string()
}

fn default_enabled() -> bool {
    true
}

/// Replace every `${NAME}` with the value of the environment variable `NAME`.
pub fn expand_env_vars(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                output.push_str(&std::env::var(name).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    output.push_str(rest);
    output
}
