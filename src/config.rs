use crate::guard::DEFAULT_MAX_INPUT_LEN;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub root: Root,
    pub server: Server,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub response: ResponseOpts,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Root { pub root_dir: PathBuf }

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Limits {
    #[serde(default = "default_max_request_kb")]
    pub max_request_kb: usize,
    #[serde(default = "default_max_input_len")]
    pub max_input_len: usize,
    #[serde(default = "default_max_file_kb")]
    pub max_file_kb: usize,
}
fn default_max_request_kb() -> usize { 16 }
fn default_max_input_len() -> usize { DEFAULT_MAX_INPUT_LEN }
fn default_max_file_kb() -> usize { 1024 }

/// Upper bound for the KiB limits (1 GiB), keeps the byte conversion in range.
pub const MAX_LIMIT_KB: usize = 1024 * 1024;

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_request_kb: default_max_request_kb(),
            max_input_len: default_max_input_len(),
            max_file_kb: default_max_file_kb(),
        }
    }
}

/// What `/read` tells the caller about where the file lives.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ResponseOpts {
    #[serde(default)]
    pub expose_path: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Logging {
    #[serde(default)]
    pub format: LogFormat,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(toml::from_str(&raw)?)
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.root.root_dir.as_os_str().is_empty() { anyhow::bail!("root_dir must not be empty"); }
        if self.root.root_dir.exists() && !self.root.root_dir.is_dir() {
            anyhow::bail!("root_dir is not a directory: {}", self.root.root_dir.display());
        }
        if self.server.bind_addr.trim().is_empty() { anyhow::bail!("bind_addr must not be empty"); }
        if self.limits.max_request_kb == 0 { anyhow::bail!("max_request_kb must be > 0"); }
        if self.limits.max_input_len == 0 { anyhow::bail!("max_input_len must be > 0"); }
        if self.limits.max_file_kb == 0 { anyhow::bail!("max_file_kb must be > 0"); }
        if self.limits.max_request_kb > MAX_LIMIT_KB { anyhow::bail!("max_request_kb must be <= {MAX_LIMIT_KB}"); }
        if self.limits.max_file_kb > MAX_LIMIT_KB { anyhow::bail!("max_file_kb must be <= {MAX_LIMIT_KB}"); }
        Ok(())
    }
}
