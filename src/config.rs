use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_version")]
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted file size in bytes
    #[serde(default = "default_max_form_size")]
    pub max_form_size: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Client registered at start-up when both id and secret are set
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Percent of the upload disk in use that fails the check; 0 disables it
    #[serde(default = "default_disk_usage_threshold")]
    pub disk_usage_threshold: f64,
}

// Default values
fn default_app_name() -> String {
    "filekeep".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "data/filekeep.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_upload_dir() -> String {
    "data/storage".to_string()
}

fn default_max_form_size() -> usize {
    32 * 1024 * 1024
}

fn default_disk_usage_threshold() -> f64 {
    95.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_form_size: default_max_form_size(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            disk_usage_threshold: default_disk_usage_threshold(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides(|key| env::var(key).ok());
        config.ensure_directories()?;
        Ok(config)
    }

    /// Load configuration from the first config file found
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = [
            "filekeep.toml",
            "config.toml",
            "data/filekeep.toml",
            "data/config.toml",
        ];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: FK_CONF_<SECTION>_<KEY>
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = var("FK_CONF_APP_NAME") {
            self.app.name = val;
        }
        if let Some(val) = var("FK_CONF_APP_VERSION") {
            self.app.version = val;
        }

        // Server overrides
        if let Some(val) = var("FK_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("FK_CONF_SERVER_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }

        // Database overrides
        if let Some(val) = var("FK_CONF_DATABASE_PATH") {
            self.database.path = val;
        }
        if let Some(n) = var("FK_CONF_DATABASE_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
            self.database.max_connections = n;
        }
        if let Some(secs) = var("FK_CONF_DATABASE_BUSY_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.database.busy_timeout_secs = secs;
        }
        if let Some(secs) = var("FK_CONF_DATABASE_ACQUIRE_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.database.acquire_timeout_secs = secs;
        }

        // Storage overrides
        if let Some(val) = var("FK_CONF_STORAGE_UPLOAD_DIR") {
            self.storage.upload_dir = val;
        }
        if let Some(size) = var("FK_CONF_UPLOAD_MAX_FORM_SIZE").and_then(|v| v.parse().ok()) {
            self.upload.max_form_size = size;
        }

        // Auth overrides
        if let Some(enabled) = var("FK_CONF_AUTH_ENABLED").and_then(|v| v.parse().ok()) {
            self.auth.enabled = enabled;
        }
        if let Some(val) = var("FK_CONF_AUTH_CLIENT_ID") {
            if !val.trim().is_empty() {
                self.auth.client_id = Some(val);
            }
        }
        if let Some(val) = var("FK_CONF_AUTH_CLIENT_SECRET") {
            if !val.trim().is_empty() {
                self.auth.client_secret = Some(val);
            }
        }

        // Health overrides
        if let Some(pct) = var("FK_CONF_HEALTH_DISK_USAGE_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.health.disk_usage_threshold = pct;
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)?;
        }

        fs::create_dir_all(&self.storage.upload_dir)?;

        Ok(())
    }
}
