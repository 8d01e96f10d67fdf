//! Configuration from the environment

use crate::locale::Locale;
use crate::runtime::WidgetOptions;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("FOLIO_ADMIN_PASSWORD is not set")]
    MissingAdminPassword,
    #[error("Invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub admin_password: Option<String>,
    pub locale: Locale,
    pub page_url: String,
    pub storage_path: PathBuf,
    pub auto_open_delay: Option<Duration>,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source (tests pass a map)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let base_url = var("FOLIO_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let locale = match var("FOLIO_LOCALE") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "FOLIO_LOCALE",
                value: raw,
            })?,
            None => Locale::default(),
        };

        let page_url = var("FOLIO_PAGE_URL").unwrap_or_else(|| format!("{base_url}/"));

        let storage_path = var("FOLIO_STORAGE_PATH").map_or_else(
            || {
                let home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
                home.join(".folio-chat").join("storage.db")
            },
            PathBuf::from,
        );

        let auto_open_delay = var("FOLIO_AUTO_OPEN_SECS")
            .map(|raw| parse_secs("FOLIO_AUTO_OPEN_SECS", raw))
            .transpose()?;

        let request_timeout = var("FOLIO_REQUEST_TIMEOUT_SECS")
            .map(|raw| parse_secs("FOLIO_REQUEST_TIMEOUT_SECS", raw))
            .transpose()?
            .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));

        Ok(Self {
            base_url,
            admin_password: var("FOLIO_ADMIN_PASSWORD"),
            locale,
            page_url,
            storage_path,
            auto_open_delay,
            request_timeout,
        })
    }

    pub fn admin_password(&self) -> Result<&str, ConfigError> {
        self.admin_password
            .as_deref()
            .ok_or(ConfigError::MissingAdminPassword)
    }

    pub fn widget_options(&self) -> WidgetOptions {
        WidgetOptions {
            locale: self.locale,
            page_url: self.page_url.clone(),
            auto_open_delay: self.auto_open_delay,
            request_timeout: Some(self.request_timeout),
        }
    }
}

fn parse_secs(name: &'static str, raw: String) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::Invalid { name, value: raw })
}
