//! Configuration loading and logging setup
//!
//! Bootstrap configuration lives in a single TOML file shared by both tools.
//! Every field is optional; service crates resolve the effective value with the
//! priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Built-in default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "STYLO_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub segmenter: SegmenterSection,
    #[serde(default)]
    pub checkpoint: CheckpointSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAiSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<GeminiSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hume: Option<HumeSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_model: Option<LocalModelSection>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Input and output folders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmenterSection {
    pub marker: Option<String>,
    pub min_chapter_chars: Option<usize>,
    pub min_paragraph_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSection {
    /// Snapshot after every N chapters
    pub interval: Option<usize>,
    /// Keep the timestamped snapshots once the final file is written
    pub keep_snapshots: Option<bool>,
}

/// Overrides for the provider's built-in rate, concurrency and retry defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitsSection {
    pub max_requests: Option<usize>,
    pub window_ms: Option<u64>,
    pub max_concurrency: Option<usize>,
    pub max_attempts: Option<u32>,
    pub backoff_ms: Option<u64>,
    pub backoff_max_ms: Option<u64>,
    pub exponential: Option<bool>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenAiSection {
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
    pub api_version: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiSection {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HumeSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub poll_timeout_ms: Option<u64>,
    pub poll_max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalModelSection {
    pub url: Option<String>,
}

// ============================================================================
// Resolution
// ============================================================================

/// Locate the config file: CLI path → `STYLO_CONFIG` → `<config_dir>/stylo/stylo.toml`
///
/// Returns `None` when no explicit path is given and the default file does not exist.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stylo").join("stylo.toml"))
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    Ok(toml::from_str(&content)?)
}

/// Resolve and load the config; no file means all defaults
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => {
            let config = load_toml_config(&path)?;
            tracing::info!(path = %path.display(), "Configuration loaded");
            Ok(config)
        }
        None => {
            tracing::debug!("No configuration file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Write the config atomically (temp file + rename), permissions 0600 on Unix
///
/// The file may hold API keys, hence the restrictive mode.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp = path.with_extension("toml.tmp");
    write_private(&temp, content.as_bytes())?;

    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(Error::Io(e));
    }
    Ok(())
}

/// Create `path` fresh and write `content`; on unix the file is 0600 from creation
fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    // A leftover temp file would keep its old mode
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::Io(e)),
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(content)?;
    file.sync_all()?;
    Ok(())
}

/// Standard User-Agent for outbound HTTP clients
pub fn get_user_agent() -> String {
    format!("stylo/{}", env!("CARGO_PKG_VERSION"))
}

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `level`. Safe to call more than once; later
/// calls are no-ops.
pub fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
