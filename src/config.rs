// src/config.rs
use log::warn;
use rust_decimal::Decimal;
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use thiserror::Error;

use crate::services::cpi_parser::DEFAULT_CPI_SOURCE_URL;
use crate::services::valuation::CPI_BASE_OCT_2001;

pub const DEFAULT_PORT: u16 = 3030;
/// Seconds-resolution cron: at minute 0 of every sixth hour (UTC).
pub const DEFAULT_REFRESH_CRON: &str = "0 0 */6 * * *";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: IpAddr,
    pub port: u16,
    pub cpi_source_url: String,
    pub frontend_urls: Vec<String>,
    pub refresh_cron: String,
    pub cpi_base: Decimal,
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

/// CORS origins must be `scheme://host[:port]`; a trailing slash is dropped.
fn parse_origins(urls: &str) -> Result<Vec<String>, ConfigError> {
    urls.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(|url| {
            let origin = url.trim_end_matches('/');
            let host = origin
                .strip_prefix("http://")
                .or_else(|| origin.strip_prefix("https://"));
            match host {
                Some(host) if !host.is_empty() && !host.contains('/') => Ok(origin.to_string()),
                _ => Err(ConfigError::Invalid {
                    key: "FRONTEND_URLS",
                    value: url.to_string(),
                }),
            }
        })
        .collect()
}

impl Settings {
    /// Reads settings from the process environment (call `dotenv()` first
    /// to pick up a `.env` file).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = match lookup("SERVER_HOST") {
            Some(value) => parse("SERVER_HOST", value)?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        // Heroku-style PORT wins over SERVER_PORT
        let port = match lookup("PORT").or_else(|| lookup("SERVER_PORT")) {
            Some(value) => parse("PORT", value)?,
            None => {
                warn!("$PORT not set, defaulting to {}", DEFAULT_PORT);
                DEFAULT_PORT
            }
        };

        let cpi_source_url = lookup("CPI_SOURCE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CPI_SOURCE_URL.to_string());

        let frontend_urls = match lookup("FRONTEND_URLS") {
            Some(urls) => parse_origins(&urls)?,
            None => Vec::new(),
        };

        let refresh_cron =
            lookup("CPI_REFRESH_CRON").unwrap_or_else(|| DEFAULT_REFRESH_CRON.to_string());

        let cpi_base = match lookup("CPI_BASE_VALUE") {
            Some(value) => {
                let base: Decimal = parse("CPI_BASE_VALUE", value.clone())?;
                if base <= Decimal::ZERO {
                    return Err(ConfigError::Invalid {
                        key: "CPI_BASE_VALUE",
                        value,
                    });
                }
                base
            }
            None => CPI_BASE_OCT_2001,
        };

        Ok(Settings {
            host,
            port,
            cpi_source_url,
            frontend_urls,
            refresh_cron,
            cpi_base,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
