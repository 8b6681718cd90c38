use crate::debugger::error::Error;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Debugger agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Only bytecode files whose name starts with this prefix are reported as scripts.
    /// An empty prefix accepts every file.
    pub allowed_path_prefix: String,
    /// Sources shorter than this are treated as "no source" placeholders and rejected.
    pub min_source_length: usize,
    /// Pause wait deadline, a pause without resuming command for this long is resumed
    /// automatically. `None` waits forever.
    pub pause_timeout_ms: Option<u64>,
    /// Default `env_logger` filter, `RUST_LOG` takes precedence.
    pub log_filter: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            allowed_path_prefix: "/data/".to_string(),
            min_source_length: 5,
            pause_timeout_ms: None,
            log_filter: None,
        }
    }
}

impl AgentConfig {
    pub fn from_toml_str(data: &str) -> Result<Self, Error> {
        Ok(toml::from_str(data)?)
    }

    /// Read configuration from a toml file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let data = std::fs::read_to_string(path)?;
        Self::from_toml_str(&data)
    }

    pub fn pause_timeout(&self) -> Option<Duration> {
        self.pause_timeout_ms.map(Duration::from_millis)
    }

    /// Install the global logger with [`AgentConfig::log_filter`] as the default filter.
    pub fn init_logging(&self) {
        crate::log::init(self.log_filter.as_deref());
    }

    /// Return true if scripts from this bytecode file may be reported to the frontend.
    pub fn is_allowed_file(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.allowed_path_prefix)
    }
}
