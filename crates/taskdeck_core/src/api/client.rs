//! HTTP client adapter for JSON REST APIs.
//!
//! # Responsibility
//! - Resolve resource paths against one configured base URL.
//! - Attach `Authorization: Bearer <token>` while a session is active.
//! - Translate non-2xx answers and malformed bodies into `ApiError`.
//!
//! # Invariants
//! - One attempt per call; no retries.
//! - Requests without an active session carry no auth header.

use super::error::{ApiError, ApiResult};
use super::session::{refresh_session, SessionHandle};
use chrono::Utc;
use log::{debug, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated JSON client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    auth_base_url: Option<Url>,
    session: SessionHandle,
}

impl ApiClient {
    /// Creates a client with the default timeout.
    ///
    /// # Errors
    /// Returns an error when `base_url` does not parse or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, session: SessionHandle) -> ApiResult<Self> {
        Self::with_timeout(base_url, session, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        session: SessionHandle,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
            auth_base_url: None,
            session,
        })
    }

    /// Enables access-token refresh against `{auth_base_url}/auth/refresh`.
    pub fn with_refresh_endpoint(mut self, auth_base_url: &str) -> ApiResult<Self> {
        self.auth_base_url = Some(parse_base_url(auth_base_url)?);
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Resolves path segments below the base URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        join_segments(&self.base_url, segments)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        let mut url = self.endpoint(segments)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let text = self.send(Method::GET, url, None::<&()>).await?;
        decode_body(&text)
    }

    pub async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let text = self.send(Method::POST, url, Some(body)).await?;
        decode_body(&text)
    }

    pub async fn put_json<B, T>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let text = self.send(Method::PUT, url, Some(body)).await?;
        decode_body(&text)
    }

    /// Sends `DELETE`; any 2xx answer counts as confirmation.
    pub async fn delete(&self, segments: &[&str]) -> ApiResult<()> {
        let url = self.endpoint(segments)?;
        self.send(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }

    async fn send<B>(&self, method: Method, url: Url, body: Option<&B>) -> ApiResult<String>
    where
        B: Serialize + ?Sized,
    {
        let started_at = Instant::now();
        let path = url.path().to_string();
        debug!(
            "event=http_request module=api status=start method={} path={}",
            method, path
        );

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        request = self.authorize(request).await;

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    "event=http_request module=api status=error method={} path={} duration_ms={} error_code=transport error={}",
                    method,
                    path,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!(
                "event=http_request module=api status=error method={} path={} duration_ms={} http_status={}",
                method,
                path,
                started_at.elapsed().as_millis(),
                status.as_u16()
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(
            "event=http_request module=api status=ok method={} path={} duration_ms={} http_status={}",
            method,
            path,
            started_at.elapsed().as_millis(),
            status.as_u16()
        );
        Ok(text)
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.bearer_token().await {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    /// Current access token, refreshing it first when it has expired.
    ///
    /// Refreshes are serialized per session handle. A caller that waited on
    /// the lock re-reads the session and reuses a token installed meanwhile.
    /// A failed refresh signs out only the session it tried to refresh.
    async fn bearer_token(&self) -> Option<String> {
        let session = self.session.current()?;
        if session.is_access_token_valid_at(Utc::now()) {
            return Some(session.access_token);
        }

        let _refresh = self.session.lock_refresh().await;
        let session = self.session.current()?;
        let now = Utc::now();
        if session.is_access_token_valid_at(now) {
            debug!("event=token_refresh module=api status=skipped reason=already_refreshed");
            return Some(session.access_token);
        }

        let (Some(auth_base_url), Some(refresh_token)) = (
            self.auth_base_url.as_ref(),
            session.usable_refresh_token_at(now),
        ) else {
            warn!("event=session_expired module=api status=error reason=no_refresh_path");
            self.session.sign_out_if_current(&session);
            return None;
        };

        match refresh_session(&self.http, auth_base_url, refresh_token).await {
            Ok(refreshed) => {
                let token = refreshed.access_token.clone();
                self.session.sign_in(refreshed);
                Some(token)
            }
            Err(err) => {
                warn!(
                    "event=session_expired module=api status=error reason=refresh_failed error={}",
                    err
                );
                self.session.sign_out_if_current(&session);
                None
            }
        }
    }
}

pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidUrl(format!("`{base}` cannot be a base url")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn parse_base_url(value: &str) -> ApiResult<Url> {
    let trimmed = value.trim();
    let url = Url::parse(trimmed)
        .map_err(|err| ApiError::InvalidUrl(format!("`{trimmed}`: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl(format!(
            "`{trimmed}` cannot be a base url"
        )));
    }
    Ok(url)
}

/// Decodes a JSON body; an empty body decodes as JSON `null`.
fn decode_body<T: DeserializeOwned>(text: &str) -> ApiResult<T> {
    let text = if text.trim().is_empty() { "null" } else { text };
    Ok(serde_json::from_str(text)?)
}
