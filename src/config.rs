//! IMAP connection configuration

use crate::connection::{DEFAULT_CONNECTION_TIMEOUT, Encryption};
use crate::error::{Error, Result};
use crate::proxy::ProxyPatch;
use std::env;
use std::time::Duration;

/// Default folder hierarchy delimiter.
pub const DEFAULT_DELIMITER: &str = "/";

/// IMAP connection configuration
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub encryption: Option<Encryption>,
    pub validate_cert: bool,
    /// Used both for establishing the connection and for each read or
    /// write afterwards.
    pub timeout: Duration,
    pub delimiter: String,
    pub proxy: ProxyPatch,
}

impl ImapConfig {
    /// Configuration with every optional setting at its default.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            encryption: Some(Encryption::Ssl),
            validate_cert: true,
            timeout: DEFAULT_CONNECTION_TIMEOUT,
            delimiter: DEFAULT_DELIMITER.to_string(),
            proxy: ProxyPatch::default(),
        }
    }

    /// Load IMAP configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `IMAP_USERNAME`
    /// - `IMAP_PASSWORD`
    ///
    /// Optional (with defaults):
    /// - `IMAP_HOST` (default: `127.0.0.1`)
    /// - `IMAP_PORT` (default: `993`)
    /// - `IMAP_ENCRYPTION` (default: `ssl`; `tls`, `starttls`, `notls`)
    /// - `IMAP_VALIDATE_CERT` (default: `true`)
    /// - `IMAP_TIMEOUT` in seconds (default: `30`)
    /// - `IMAP_DELIMITER` (default: `/`)
    /// - `IMAP_PROXY_SOCKET`, `IMAP_PROXY_REQUEST_FULLURI`,
    ///   `IMAP_PROXY_USERNAME`, `IMAP_PROXY_PASSWORD` (default: unset)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`Self::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).ok_or_else(|| Error::Config(format!("{key} not set")));

        let port: u16 = lookup("IMAP_PORT")
            .map_or(Ok(993), |v| v.trim().parse())
            .map_err(|e| Error::Config(format!("Invalid IMAP_PORT: {e}")))?;
        let encryption = match lookup("IMAP_ENCRYPTION") {
            Some(value) => Encryption::from_config(&value)?,
            None => Some(Encryption::Ssl),
        };
        let timeout: u64 = lookup("IMAP_TIMEOUT")
            .map_or(Ok(DEFAULT_CONNECTION_TIMEOUT.as_secs()), |v| v.trim().parse())
            .map_err(|e| Error::Config(format!("Invalid IMAP_TIMEOUT: {e}")))?;

        let proxy = ProxyPatch {
            socket: lookup("IMAP_PROXY_SOCKET"),
            request_fulluri: lookup("IMAP_PROXY_REQUEST_FULLURI")
                .map(|v| parse_bool("IMAP_PROXY_REQUEST_FULLURI", &v))
                .transpose()?,
            username: lookup("IMAP_PROXY_USERNAME"),
            password: lookup("IMAP_PROXY_PASSWORD"),
        };

        Ok(Self {
            host: lookup("IMAP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            username: required("IMAP_USERNAME")?,
            password: required("IMAP_PASSWORD")?,
            encryption,
            validate_cert: lookup("IMAP_VALIDATE_CERT")
                .map_or(Ok(true), |v| parse_bool("IMAP_VALIDATE_CERT", &v))?,
            timeout: Duration::from_secs(timeout),
            delimiter: lookup("IMAP_DELIMITER").unwrap_or_else(|| DEFAULT_DELIMITER.to_string()),
            proxy,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("Invalid {key}: {other}"))),
    }
}
