//! Application configuration.
//!
//! # Responsibility
//! - Load endpoint, storage and logging settings from TOML and environment.
//! - Validate settings before any client is built from them.
//!
//! # Invariants
//! - Environment values override file values field by field.
//! - A validated config always carries parseable absolute base URLs.

use crate::api::{ApiClient, ApiError, Session, SessionHandle};
use crate::api::session::parse_expiry;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "TASKDECK_";
const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_MOVIE_API_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_DB_FILE_NAME: &str = "taskdeck.sqlite3";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
    #[error(transparent)]
    Client(#[from] ApiError),
}

/// Runtime settings for the task and movie clients.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Base URL of the task REST backend (`/todos` lives below it).
    pub api_base_url: String,
    /// Base URL of the auth backend; enables token refresh when set.
    pub auth_base_url: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// RFC 3339 or epoch seconds.
    pub access_token_expires_at: Option<String>,
    /// Same formats as `access_token_expires_at`.
    pub refresh_token_expires_at: Option<String>,
    pub movie_api_base_url: String,
    pub movie_api_token: Option<String>,
    pub db_path: PathBuf,
    pub request_timeout_secs: u64,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_base_url: None,
            access_token: None,
            refresh_token: None,
            access_token_expires_at: None,
            refresh_token_expires_at: None,
            movie_api_base_url: DEFAULT_MOVIE_API_BASE_URL.to_string(),
            movie_api_token: None,
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_level: None,
            log_dir: None,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads an optional file, then applies `TASKDECK_*` variables and
    /// validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields from `TASKDECK_<FIELD>` variables.
    pub fn apply_env(
        &mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .map(|field| (field.to_ascii_lowercase(), value))
            })
            .collect();

        for (field, value) in vars {
            match field.as_str() {
                "api_base_url" => self.api_base_url = value,
                "auth_base_url" => self.auth_base_url = non_empty(value),
                "access_token" => self.access_token = non_empty(value),
                "refresh_token" => self.refresh_token = non_empty(value),
                "access_token_expires_at" => self.access_token_expires_at = non_empty(value),
                "refresh_token_expires_at" => self.refresh_token_expires_at = non_empty(value),
                "movie_api_base_url" => self.movie_api_base_url = value,
                "movie_api_token" => self.movie_api_token = non_empty(value),
                "db_path" => self.db_path = PathBuf::from(value),
                "request_timeout_secs" => {
                    self.request_timeout_secs =
                        value.trim().parse().map_err(|_| ConfigError::Invalid {
                            field: "request_timeout_secs",
                            message: format!("`{value}` is not a whole number of seconds"),
                        })?;
                }
                "log_level" => self.log_level = non_empty(value),
                "log_dir" => self.log_dir = non_empty(value).map(PathBuf::from),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("api_base_url", &self.api_base_url)?;
        check_url("movie_api_base_url", &self.movie_api_base_url)?;
        if let Some(auth_base_url) = self.auth_base_url.as_deref() {
            check_url("auth_base_url", auth_base_url)?;
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        for (field, expiry) in [
            ("access_token_expires_at", &self.access_token_expires_at),
            ("refresh_token_expires_at", &self.refresh_token_expires_at),
        ] {
            if let Some(expiry) = expiry.as_deref() {
                if parse_expiry(expiry).is_none() {
                    return Err(ConfigError::Invalid {
                        field,
                        message: format!("`{expiry}` is neither RFC 3339 nor epoch seconds"),
                    });
                }
            }
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "db_path",
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Session described by the configured tokens, if any.
    pub fn session(&self) -> Option<Session> {
        let access_token = self.access_token.clone()?;
        let mut session = Session::bearer(access_token);
        session.refresh_token = self.refresh_token.clone();
        session.access_token_expires_at = self
            .access_token_expires_at
            .as_deref()
            .and_then(parse_expiry);
        session.refresh_token_expires_at = self
            .refresh_token_expires_at
            .as_deref()
            .and_then(parse_expiry);
        Some(session)
    }

    /// Client for the task backend sharing `session`.
    pub fn task_client(&self, session: SessionHandle) -> Result<ApiClient, ConfigError> {
        let client = ApiClient::with_timeout(&self.api_base_url, session, self.request_timeout())?;
        match self.auth_base_url.as_deref() {
            Some(auth_base_url) => Ok(client.with_refresh_endpoint(auth_base_url)?),
            None => Ok(client),
        }
    }

    /// Client for the movie API, authenticated with its own static token.
    pub fn movie_client(&self) -> Result<ApiClient, ConfigError> {
        let session = match self.movie_api_token.as_deref() {
            Some(token) => SessionHandle::signed_in(Session::bearer(token)),
            None => SessionHandle::anonymous(),
        };
        Ok(ApiClient::with_timeout(
            &self.movie_api_base_url,
            session,
            self.request_timeout(),
        )?)
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim()).map_err(|err| ConfigError::Invalid {
        field,
        message: format!("`{value}`: {err}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            field,
            message: format!("unsupported scheme `{}`", url.scheme()),
        });
    }
    Ok(())
}
