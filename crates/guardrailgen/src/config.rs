use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Project name recorded in imported and generated artifacts.
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub generate: GenerateConfig,
    /// Append decision entries here when set.
    #[serde(default)]
    pub decision_log: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Deserialize)]
pub struct GenerateConfig {
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// Right-hand side of the engine dependency in generated Cargo manifests.
    #[serde(default)]
    pub engine_dependency: Option<String>,
    #[serde(default = "default_cli_binary")]
    pub cli_binary: String,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            out_dir: default_out_dir(),
            engine_dependency: None,
            cli_binary: default_cli_binary(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default-value functions used by serde
// ---------------------------------------------------------------------------

fn default_log_level() -> String {
    "info".to_string()
}

fn default_lang() -> String {
    "rust".to_string()
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("guardrails-tests")
}

fn default_cli_binary() -> String {
    "guardrailgen".to_string()
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load configuration from a YAML file.
///
/// A missing file is not an error: `None` is returned so the caller can fall
/// back to defaults and report it once logging is up.
pub fn load(path: &Path) -> anyhow::Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

    parse(&contents)
        .map(Some)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))
}

fn parse(contents: &str) -> Result<Config, serde_yml::Error> {
    // An empty file deserializes to unit, not to an empty mapping.
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yml::from_str(contents)
}
