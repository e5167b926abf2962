// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Every key the service reads must be registered in [`REGISTRY`] with its
//! type. Lookups of unregistered keys, or of a key under the wrong type, are
//! configuration errors rather than silent defaults.

use std::collections::HashMap;
use std::env;
use std::fmt;

/// Type of a registered configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Boolean,
    String,
    Number,
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeyType::Boolean => "boolean",
            KeyType::String => "string",
            KeyType::Number => "number",
        };
        f.write_str(name)
    }
}

/// Every configuration key the service understands.
pub const REGISTRY: &[(&str, KeyType)] = &[
    ("PRODUCTION", KeyType::Boolean),
    ("LOG_DEBUG", KeyType::Boolean),
    ("CHECK_TOKEN_USER", KeyType::Boolean),
    ("CRYPT_PASS", KeyType::String),
    ("DOMAIN_NAME", KeyType::String),
    ("VERIFY_ENDPOINT", KeyType::String),
    ("MAIL_ADDR", KeyType::String),
    ("LOG_ADDR", KeyType::String),
    ("SMTP_HOST", KeyType::String),
    ("SMTP_USER", KeyType::String),
    ("SMTP_PASS", KeyType::String),
    ("GCP_PROJECT_ID", KeyType::String),
    ("DATA_DIR", KeyType::String),
    ("CLIENT_DIR", KeyType::String),
    ("FRONTEND_URL", KeyType::String),
    ("PORT", KeyType::Number),
    ("SEARCH_RANGE", KeyType::Number),
    ("SMTP_PORT", KeyType::Number),
];

/// Typed view over a set of raw environment values.
#[derive(Clone, Default)]
pub struct ConfigSource {
    vars: HashMap<String, String>,
}

// Values may be secrets; only the key names are shown.
impl fmt::Debug for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.vars.keys().collect();
        keys.sort();
        f.debug_struct("ConfigSource").field("keys", &keys).finish()
    }
}

impl ConfigSource {
    /// Snapshot the process environment (after loading `.env` if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            vars: env::vars().collect(),
        }
    }

    /// Registered keys with no value in this source.
    pub fn unset_keys(&self) -> Vec<(&'static str, KeyType)> {
        REGISTRY
            .iter()
            .filter(|(key, _)| !self.is_set(key))
            .map(|(key, ty)| (*key, *ty))
            .collect()
    }

    /// Log unset keys. Call once logging is initialized.
    pub fn log_unset_keys(&self) {
        for (key, ty) in self.unset_keys() {
            tracing::info!(key, key_type = %ty, "Config key not set");
        }
    }

    /// Build a source from explicit key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    fn raw(&self, key: &'static str, expected: KeyType) -> Result<&str, ConfigError> {
        let registered = REGISTRY
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, ty)| *ty)
            .ok_or(ConfigError::Unregistered(key))?;

        if registered != expected {
            return Err(ConfigError::WrongType { key, expected });
        }

        self.vars
            .get(key)
            .map(String::as_str)
            .ok_or(ConfigError::Missing(key))
    }

    pub fn string(&self, key: &'static str) -> Result<String, ConfigError> {
        self.raw(key, KeyType::String).map(|v| v.trim().to_string())
    }

    pub fn string_or(&self, key: &'static str, default: &str) -> Result<String, ConfigError> {
        match self.string(key) {
            Err(ConfigError::Missing(_)) => {
                tracing::info!(key, default, "Config key defaulted");
                Ok(default.to_string())
            }
            other => other,
        }
    }

    pub fn optional_string(&self, key: &'static str) -> Result<Option<String>, ConfigError> {
        match self.string(key) {
            Ok(v) if v.is_empty() => Ok(None),
            Ok(v) => Ok(Some(v)),
            Err(ConfigError::Missing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn number(&self, key: &'static str) -> Result<i64, ConfigError> {
        let value = self.raw(key, KeyType::Number)?;
        value.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: value.to_string(),
            expected: KeyType::Number,
        })
    }

    pub fn number_or(&self, key: &'static str, default: i64) -> Result<i64, ConfigError> {
        match self.number(key) {
            Err(ConfigError::Missing(_)) => Ok(default),
            other => other,
        }
    }

    pub fn boolean(&self, key: &'static str) -> Result<bool, ConfigError> {
        match self.raw(key, KeyType::Boolean)? {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ConfigError::Invalid {
                key,
                value: other.to_string(),
                expected: KeyType::Boolean,
            }),
        }
    }

    pub fn boolean_or(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.boolean(key) {
            Err(ConfigError::Missing(_)) => {
                tracing::info!(key, default, "Config key defaulted");
                Ok(default)
            }
            other => other,
        }
    }
}

/// SMTP relay settings. Absent when mail is disabled.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Application configuration, loaded once at startup.
#[derive(Clone)]
pub struct Config {
    /// Production mode: strict mail handling, error alerts, secure cookies
    pub production: bool,
    /// Enables debug-level logs for this crate
    pub log_debug: bool,
    /// Whether auth tokens must reference an existing user
    pub check_token_user: bool,
    /// Server port
    pub port: u16,
    /// Hour window used when matching subscribers to a new trip
    pub search_range: u32,
    /// Secret for auth-token encryption
    pub crypt_pass: String,
    /// Public base URL, used in verification links
    pub domain_name: String,
    /// Path segment of the email verification route
    pub verify_endpoint: String,
    /// Sender address for outgoing mail
    pub mail_addr: String,
    /// Recipient for production error alerts
    pub log_addr: Option<String>,
    /// SMTP relay (None disables mail)
    pub smtp: Option<SmtpConfig>,
    /// GCP project for Firestore (None selects the in-memory store)
    pub gcp_project_id: Option<String>,
    /// Directory holding `airport-codes.dat` and `colleges.dat`
    pub data_dir: String,
    /// Directory of the compiled web client
    pub client_dir: String,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
}

const REDACTED: &str = "<redacted>";

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("production", &self.production)
            .field("log_debug", &self.log_debug)
            .field("check_token_user", &self.check_token_user)
            .field("port", &self.port)
            .field("search_range", &self.search_range)
            .field("crypt_pass", &REDACTED)
            .field("domain_name", &self.domain_name)
            .field("verify_endpoint", &self.verify_endpoint)
            .field("mail_addr", &self.mail_addr)
            .field("log_addr", &self.log_addr)
            .field("smtp", &self.smtp)
            .field("gcp_project_id", &self.gcp_project_id)
            .field("data_dir", &self.data_dir)
            .field("client_dir", &self.client_dir)
            .field("frontend_url", &self.frontend_url)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ConfigSource::from_env())
    }

    pub fn from_source(source: &ConfigSource) -> Result<Self, ConfigError> {
        let smtp = match source.optional_string("SMTP_HOST")? {
            Some(host) => Some(SmtpConfig {
                host,
                port: u16::try_from(source.number_or("SMTP_PORT", 587)?).map_err(|_| {
                    ConfigError::Invalid {
                        key: "SMTP_PORT",
                        value: source.vars.get("SMTP_PORT").cloned().unwrap_or_default(),
                        expected: KeyType::Number,
                    }
                })?,
                username: source.string("SMTP_USER")?,
                password: source.string("SMTP_PASS")?,
            }),
            None => None,
        };

        let crypt_pass = source.string("CRYPT_PASS")?;
        if crypt_pass.is_empty() {
            return Err(ConfigError::Missing("CRYPT_PASS"));
        }

        let search_range = source.number_or("SEARCH_RANGE", 2)?;
        let search_range = u32::try_from(search_range).map_err(|_| ConfigError::Invalid {
            key: "SEARCH_RANGE",
            value: search_range.to_string(),
            expected: KeyType::Number,
        })?;

        let port = source.number_or("PORT", 5000)?;
        let port = u16::try_from(port).map_err(|_| ConfigError::Invalid {
            key: "PORT",
            value: port.to_string(),
            expected: KeyType::Number,
        })?;

        Ok(Self {
            production: source.boolean_or("PRODUCTION", false)?,
            log_debug: source.boolean_or("LOG_DEBUG", false)?,
            check_token_user: source.boolean_or("CHECK_TOKEN_USER", true)?,
            port,
            search_range,
            crypt_pass,
            domain_name: source.string_or("DOMAIN_NAME", "http://localhost:5000")?,
            verify_endpoint: source.string_or("VERIFY_ENDPOINT", "verify")?,
            mail_addr: source.string_or("MAIL_ADDR", "no-reply@igetback.local")?,
            log_addr: source.optional_string("LOG_ADDR")?,
            smtp,
            gcp_project_id: source.optional_string("GCP_PROJECT_ID")?,
            data_dir: source.string_or("DATA_DIR", "data")?,
            client_dir: source.string_or("CLIENT_DIR", "client/dist")?,
            frontend_url: source.string_or("FRONTEND_URL", "http://localhost:5000")?,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            production: false,
            log_debug: true,
            check_token_user: true,
            port: 5000,
            search_range: 2,
            crypt_pass: "test_crypt_pass".to_string(),
            domain_name: "http://localhost:5000".to_string(),
            verify_endpoint: "verify".to_string(),
            mail_addr: "no-reply@igetback.test".to_string(),
            log_addr: Some("alerts@igetback.test".to_string()),
            smtp: None,
            gcp_project_id: None,
            data_dir: "data".to_string(),
            client_dir: "client/dist".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required config key: {0}")]
    Missing(&'static str),

    #[error("Config key {0} is not registered")]
    Unregistered(&'static str),

    #[error("Config key {key} is not of type '{expected}'")]
    WrongType {
        key: &'static str,
        expected: KeyType,
    },

    #[error("Config key {key} set to '{value}' which is not a valid {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: KeyType,
    },
}
