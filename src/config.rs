use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure loaded from cobol_lens.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub flowchart: FlowchartConfig,
    pub cache: CacheConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            max_upload_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Gemini model settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub api_base: String,
    pub timeout_ms: u64,
    pub retries: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gemini-1.5-pro".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_ms: 60_000,
            retries: 3,
        }
    }
}

/// Layout engine settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FlowchartConfig {
    /// Graphviz executable, either a bare name resolved through PATH or a path
    pub dot_command: String,
}

impl Default for FlowchartConfig {
    fn default() -> Self {
        Self {
            dot_command: "dot".to_string(),
        }
    }
}

/// Result cache sizing and expiry
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    /// 0 disables expiry
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl_secs: 0,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub google_api_key: Option<String>,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            log_level: "cobol_lens=info,tower_http=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn load_from_env() -> Self {
        let mut config = Self::default();

        config.google_api_key = std::env::var("GOOGLE_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !is_placeholder(k));

        if let Ok(level) = std::env::var("RUST_LOG")
            && !level.trim().is_empty()
        {
            config.log_level = level;
        }

        config
    }
}

fn is_placeholder(s: &str) -> bool {
    let t = s.trim();
    t.is_empty()
        || t.contains("${")
        || t.eq_ignore_ascii_case("your-api-key-here")
        || t.eq_ignore_ascii_case("changeme")
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses COBOL_LENS_CONFIG environment variable or defaults to "cobol_lens.toml"
    pub fn load() -> anyhow::Result<Self> {
        Self::load_env();
        Self::load_from_path(Self::default_path())
    }

    /// COBOL_LENS_CONFIG if set, otherwise ./cobol_lens.toml
    pub fn default_path() -> PathBuf {
        std::env::var_os("COBOL_LENS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("cobol_lens.toml"))
    }

    /// Load COBOL_LENS_ENV_FILE if set, otherwise ./.env; missing files are ignored
    pub fn load_env() {
        if let Ok(env_path) = std::env::var("COBOL_LENS_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }
    }

    /// Load from an explicit TOML path, then apply env overrides and validate
    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config: Config = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file {}", path.display()));
            }
        };

        config.apply_env_overrides()?;
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            self.model.name = model;
        }
        if let Ok(base) = std::env::var("GEMINI_API_BASE") {
            self.model.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(ms) = env_parse::<u64>("GEMINI_TIMEOUT_MS") {
            self.model.timeout_ms = ms;
        }
        if let Some(n) = env_parse::<u32>("GEMINI_RETRIES") {
            self.model.retries = n.clamp(1, 5);
        }
        if let Ok(bind) = std::env::var("COBOL_LENS_BIND") {
            self.server.bind = bind
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid COBOL_LENS_BIND '{}': {}", bind, e))?;
        }
        if let Some(n) = env_parse::<usize>("COBOL_LENS_MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = n;
        }
        if let Ok(cmd) = std::env::var("COBOL_LENS_DOT_COMMAND") {
            self.flowchart.dot_command = cmd;
        }
        if let Some(n) = env_parse::<usize>("COBOL_LENS_CACHE_MAX") {
            self.cache.max_entries = n;
        }
        if let Some(secs) = env_parse::<u64>("COBOL_LENS_CACHE_TTL_SECS") {
            self.cache.ttl_secs = secs;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.model.name.trim().is_empty() {
            anyhow::bail!("model.name must not be empty");
        }
        if self.model.retries == 0 {
            anyhow::bail!("model.retries must be at least 1");
        }
        if self.server.max_upload_bytes == 0 {
            anyhow::bail!("server.max_upload_bytes must be greater than 0");
        }
        if self.cache.max_entries == 0 {
            anyhow::bail!("cache.max_entries must be greater than 0");
        }
        if self.flowchart.dot_command.trim().is_empty() {
            anyhow::bail!("flowchart.dot_command must not be empty");
        }
        Ok(())
    }

    /// Result cache TTL, `None` when expiry is disabled
    pub fn cache_ttl(&self) -> Option<std::time::Duration> {
        (self.cache.ttl_secs > 0).then(|| std::time::Duration::from_secs(self.cache.ttl_secs))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
