use std::{env, time};

use config::{Config, ConfigError, Environment, File};
use reqwest::Url;
use secrecy::SecretString;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::ConnectOptions;
use tracing::log::LevelFilter;
use url::ParseError;

use crate::domain::EmailAddress;
use crate::mailer::Mailer;
use crate::price_client::PriceClient;

/// Settings
#[derive(Clone, serde::Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub price_api: PriceApiSettings,
    pub mail: MailSettings,
    pub watcher: WatcherSettings,
}

impl Settings {
    /// Get settings from configuration files
    pub fn get_config() -> Result<Self, ConfigError> {
        let path = env::current_dir().expect("Failed to determine the current directory");
        let config_dir = path.join("config");

        // Detect the running environment (default: `dev`)
        let env: Env = env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "dev".into())
            .try_into()
            .expect("Failed to parse APP_ENVIRONMENT");

        // Read the configuration from files and environment variables
        Config::builder()
            // Base configuration file
            .add_source(File::from(config_dir.join("base.yaml")).required(true))
            // Environment-specific configuration file
            .add_source(File::from(config_dir.join(env.as_str())).required(true))
            // Environment variables (e.g., `STOCKWATCH__APPLICATION__APP_PORT=8888`
            // would set Settings.application.app_port to 8888)
            .add_source(Environment::with_prefix("STOCKWATCH").separator("__"))
            .build()?
            .try_deserialize()
    }
}

/// Application settings
#[derive(Clone, serde::Deserialize)]
pub struct ApplicationSettings {
    pub app_host: String,
    pub app_port: u16,
}

/// Database settings
#[derive(Clone, serde::Deserialize)]
pub struct DatabaseSettings {
    database_path: String,
    create_if_missing: bool,
}

impl DatabaseSettings {
    /// Generate options and flags that can be used to configure a database connection
    pub fn db_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(self.create_if_missing)
            .log_statements(LevelFilter::Trace)
    }
}

/// Price API client settings
#[derive(Clone, serde::Deserialize)]
pub struct PriceApiSettings {
    pub base_url: String,
    pub ticker: String,
    pub api_key: SecretString,
    pub api_host: String,
    pub timeout_millis: u64,
}

impl PriceApiSettings {
    /// Build the price API client
    pub fn client(self) -> PriceClient {
        let base_url = self.base_url().expect("Invalid price API base URL");
        PriceClient::new(
            base_url,
            self.ticker.clone(),
            self.api_key.clone(),
            self.api_host.clone(),
            self.timeout(),
        )
    }

    /// Parse base URL
    pub fn base_url(&self) -> Result<Url, ParseError> {
        Url::parse(&self.base_url)
    }

    /// Get configured timeout
    pub const fn timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_millis)
    }
}

/// Outbound mail settings
#[derive(Clone, serde::Deserialize)]
pub struct MailSettings {
    pub relay_host: String,
    pub sender_email: String,
    pub password: SecretString,
    pub receiver_email: Option<String>,
}

impl MailSettings {
    /// Build the mail sender for the configured ticker
    pub fn mailer(self, ticker: String) -> anyhow::Result<Mailer> {
        let sender = self
            .sender_email()
            .map_err(|e| anyhow::anyhow!("Invalid sender email address: {e}"))?;
        let receiver = match &self.receiver_email {
            Some(email) => Some(
                EmailAddress::parse(email.clone())
                    .map_err(|e| anyhow::anyhow!("Invalid receiver email address: {e}"))?,
            ),
            None => None,
        };
        Mailer::new(
            &self.relay_host,
            self.sender_email.clone(),
            self.password.clone(),
            &sender,
            receiver.as_ref(),
            ticker,
        )
    }

    /// Parse sender email
    pub fn sender_email(&self) -> Result<EmailAddress, String> {
        EmailAddress::parse(self.sender_email.clone())
    }
}

/// Price watcher settings
#[derive(Clone, serde::Deserialize)]
pub struct WatcherSettings {
    pub period_secs: u64,
    pub idle_secs: u64,
}

impl WatcherSettings {
    /// Interval between price checks
    pub const fn period(&self) -> time::Duration {
        time::Duration::from_secs(self.period_secs)
    }

    /// Idle sleep between loop iterations
    pub const fn idle(&self) -> time::Duration {
        time::Duration::from_secs(self.idle_secs)
    }
}

/// Available runtime environments
pub enum Env {
    Development,
    Production,
}

impl Env {
    /// Represent environment as a string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "dev",
            Self::Production => "prd",
        }
    }
}

impl TryFrom<String> for Env {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "dev" => Ok(Self::Development),
            "prd" => Ok(Self::Production),
            other => Err(format!(
                "`{other}` is not a supported environment. Use either `dev` or `prd`"
            )),
        }
    }
}
