//! Resolver configuration
//!
//! [`ResolverConfig`] controls where the manifest search starts, which file
//! extension marks a manifest, and which projects enter the solution
//! snapshot. It can be built in code or read from TOML.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;

/// Settings for discovery and the solution snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Extension of the manifest file, without the dot
    #[serde(default = "default_manifest_extension")]
    pub manifest_extension: String,

    /// Directory the upward manifest search starts from. Defaults to the
    /// process working directory at discovery time.
    #[serde(default)]
    pub search_root: Option<PathBuf>,

    /// When set, only manifest projects whose names start with this prefix
    /// become part of the solution snapshot.
    #[serde(default)]
    pub module_prefix: Option<String>,
}

fn default_manifest_extension() -> String {
    "sln".to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            manifest_extension: default_manifest_extension(),
            search_root: None,
            module_prefix: None,
        }
    }
}

impl ResolverConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_root = Some(root.into());
        self
    }

    pub fn with_module_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.module_prefix = Some(prefix.into());
        self
    }

    pub fn with_manifest_extension(mut self, extension: impl Into<String>) -> Self {
        self.manifest_extension = extension.into();
        self
    }

    pub(crate) fn accepts_module(&self, name: &str) -> bool {
        self.module_prefix
            .as_deref()
            .map_or(true, |prefix| name.starts_with(prefix))
    }
}

impl FromStr for ResolverConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
