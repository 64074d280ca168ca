use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct PlatformConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Control-plane catalog database.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    /// Public domain used to build per-tenant login URLs
    /// (`https://{code}.{domain}/login`). When unset, login URLs fall back
    /// to the platform host.
    pub domain: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

/// Where tenant databases live and the connection coordinates recorded in
/// the catalog for each of them. With the embedded engine the files are
/// owned by this node; `host`/`port` are bookkeeping for deployments that
/// serve tenant databases over the network (port 0 = no listener).
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default)]
    pub port: u16,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dir: default_db_dir(),
            host: default_db_host(),
            port: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvisioningConfig {
    /// Deadline for the new tenant database to answer `SELECT 1`.
    #[serde(default = "default_readiness_timeout")]
    pub readiness_timeout_secs: u64,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            readiness_timeout_secs: default_readiness_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_from_name() -> String {
    "HR Platform".into()
}

// Default functions
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}
fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/catalog.db")
}
fn default_db_dir() -> PathBuf {
    PathBuf::from("data/tenants")
}
fn default_db_host() -> String {
    "127.0.0.1".into()
}
fn default_readiness_timeout() -> u64 {
    10
}

/// Load config from TOML file with env var overrides.
pub fn load(path: &str) -> anyhow::Result<PlatformConfig> {
    let content = if std::path::Path::new(path).exists() {
        std::fs::read_to_string(path)?
    } else {
        tracing::warn!("Config file not found at {}, using defaults", path);
        String::new()
    };

    let mut config: PlatformConfig = toml::from_str(&content)?;

    // Env var overrides
    if let Ok(v) = std::env::var("HRPLATFORM_HOST") {
        config.host = v;
    }
    if let Ok(v) = std::env::var("HRPLATFORM_PORT") {
        config.port = v.parse()?;
    }
    if let Ok(v) = std::env::var("HRPLATFORM_CATALOG_PATH") {
        config.catalog_path = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("HRPLATFORM_DB_DIR") {
        config.database.dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("HRPLATFORM_DOMAIN") {
        config.domain = Some(v);
    }

    Ok(config)
}
