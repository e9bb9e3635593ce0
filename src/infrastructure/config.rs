//! Configuration for tokenscope.
//!
//! Loaded from a TOML file: an explicit `--config` path, else
//! `tokenscope.toml` in the working directory, else built-in defaults.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::taxonomy::Taxonomy;
use crate::domain::usage::{UsagePolicy, FONT_FAMILY};
use crate::domain::walker::ScanMode;

pub const DEFAULT_CONFIG_FILE: &str = "tokenscope.toml";
pub const DEFAULT_PORT: u16 = 4599;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub usage: UsageConfig,
    pub scan: ScanConfig,
    pub taxonomy: Taxonomy,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Name fragments that force a variable to count as used.
    pub forced_used: Vec<String>,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            forced_used: vec![FONT_FAMILY.to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub mode: ScanMode,
    /// Rayon workers for parallel scans; defaults to half the cores.
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl Config {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn usage_policy(&self) -> UsagePolicy {
        UsagePolicy {
            forced_used: self.usage.forced_used.clone(),
            taxonomy: self.taxonomy.clone(),
        }
    }
}
