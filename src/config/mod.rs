use std::path::PathBuf;

use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the application
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL. Without it only guest-local mode is available.
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Apply the bundled migrations on startup
    #[serde(default)]
    pub run_migrations: bool,

    /// File backing the guest key-value store
    #[serde(default = "default_guest_store_path")]
    pub guest_store_path: PathBuf,

    #[serde(default = "default_invoice_dir")]
    pub invoice_dir: PathBuf,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Authenticated user id handed over by the identity provider
    #[serde(default)]
    pub freelance_hub_user_id: Option<String>,

    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default)]
    pub smtp_from: Option<String>,
}

/// SMTP settings, present only when every field is configured.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

fn default_max_connections() -> u32 {
    5
}

fn default_guest_store_path() -> PathBuf {
    PathBuf::from(".freelance_hub/guest.json")
}

fn default_invoice_dir() -> PathBuf {
    PathBuf::from("invoices")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("freelance_hub.log")
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn smtp(&self) -> Option<SmtpConfig> {
        Some(SmtpConfig {
            host: self.smtp_host.clone()?,
            username: self.smtp_username.clone()?,
            password: self.smtp_password.clone()?,
            from: self.smtp_from.clone()?,
        })
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}
