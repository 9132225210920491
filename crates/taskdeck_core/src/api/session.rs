//! Authenticated session shared by API clients.
//!
//! # Responsibility
//! - Hold the bearer token pair issued by the backend after sign-in.
//! - Refresh an expired access token through the backend refresh endpoint.
//!
//! # Invariants
//! - A session without expiry metadata is treated as valid until signed out.
//! - Lock poisoning never propagates; the last written session wins.
//! - At most one refresh runs per handle; waiters reuse its result.

use super::error::{ApiError, ApiResult};
use chrono::{DateTime, TimeZone, Utc};
use log::{info, warn};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, MutexGuard};

const REFRESH_PATH: [&str; 2] = ["auth", "refresh"];
const REFRESH_OK_STATUS: u16 = 200;

/// Tokens for one signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Session carrying only a non-expiring access token.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            access_token_expires_at: None,
            refresh_token_expires_at: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_access_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.access_token_expires_at = Some(expires_at);
        self
    }

    pub fn is_access_token_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.access_token_expires_at
            .map_or(true, |expires_at| expires_at > now)
    }

    /// Returns the refresh token if it exists and has not expired.
    pub fn usable_refresh_token_at(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.refresh_token.as_deref()?;
        match self.refresh_token_expires_at {
            Some(expires_at) if expires_at <= now => None,
            _ => Some(token),
        }
    }
}

/// Cloneable handle to the process session slot.
///
/// Every client built from the same handle observes sign-in, refresh and
/// sign-out immediately.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<Session>>>,
    refresh_lock: Arc<Mutex<()>>,
}

impl SessionHandle {
    /// Handle with no active session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(session: Session) -> Self {
        let handle = Self::default();
        handle.sign_in(session);
        handle
    }

    pub fn sign_in(&self, session: Session) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn sign_out(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn current(&self) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Signs out only while `expected` is still the stored session.
    ///
    /// Returns `false` when another caller already replaced or cleared it.
    pub fn sign_out_if_current(&self, expected: &Session) -> bool {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref() != Some(expected) {
            return false;
        }
        *slot = None;
        true
    }

    /// Serializes token refreshes across every clone of this handle.
    pub(crate) async fn lock_refresh(&self) -> MutexGuard<'_, ()> {
        self.refresh_lock.lock().await
    }
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshEnvelope {
    #[serde(rename = "statusCode")]
    status_code: u16,
    #[serde(default)]
    data: Option<RefreshPayload>,
}

#[derive(Debug, Deserialize)]
struct RefreshPayload {
    #[serde(rename = "strAccess_token")]
    access_token: String,
    #[serde(rename = "access_token_expiresIn", default)]
    access_token_expires_in: Option<String>,
    #[serde(rename = "strRefresh_token", default)]
    refresh_token: Option<String>,
    #[serde(rename = "refresh_token_expiresIn", default)]
    refresh_token_expires_in: Option<String>,
}

/// Exchanges a refresh token for a new session.
///
/// # Errors
/// - `ApiError::Refresh` when the envelope status is not 200 or carries no
///   token payload.
/// - Transport, status and decode errors from the HTTP exchange.
pub async fn refresh_session(
    http: &Client,
    auth_base_url: &Url,
    refresh_token: &str,
) -> ApiResult<Session> {
    let url = super::client::join_segments(auth_base_url, &REFRESH_PATH)?;
    info!("event=token_refresh module=api status=start");

    let response = http
        .post(url)
        .json(&RefreshRequest {
            refresh: refresh_token,
        })
        .send()
        .await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        warn!(
            "event=token_refresh module=api status=error http_status={}",
            status.as_u16()
        );
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let envelope: RefreshEnvelope = serde_json::from_str(&body)?;
    if envelope.status_code != REFRESH_OK_STATUS {
        return Err(ApiError::Refresh(format!(
            "invalid response status code {}",
            envelope.status_code
        )));
    }
    let payload = envelope
        .data
        .ok_or_else(|| ApiError::Refresh("response carries no token data".to_string()))?;

    info!("event=token_refresh module=api status=ok");
    Ok(Session {
        access_token: payload.access_token,
        refresh_token: payload
            .refresh_token
            .or_else(|| Some(refresh_token.to_string())),
        access_token_expires_at: payload
            .access_token_expires_in
            .as_deref()
            .and_then(parse_expiry),
        refresh_token_expires_at: payload
            .refresh_token_expires_in
            .as_deref()
            .and_then(parse_expiry),
    })
}

/// Parses a backend expiry stamp: RFC 3339 text or unix epoch seconds.
pub fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    let seconds = trimmed.parse::<i64>().ok()?;
    Utc.timestamp_opt(seconds, 0).single()
}
