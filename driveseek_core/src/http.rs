//! Resilient HTTP execution: bounded retries, 429 backoff, 401 refresh.
//!
//! One call moves through an explicit state machine; every pass through
//! `Attempting` consumes one slot of the attempt budget, whether the
//! previous pass ended in a transport failure, a rate-limit wait, or a
//! token refresh.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::{Session, TokenProvider};
use crate::error::PipelineError;

/// Extra attempts after the first.
pub const MAX_RETRIES: u32 = 2;
/// Backoff applied when a 429 carries no `Retry-After` header.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);
/// Per-request timeout; a hung remote must not pin a worker slot forever.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// What to do with a response, decided purely from its status and headers.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// Hand the response back to the caller as-is.
    Return,
    /// 401 with a named account: refresh the bearer and go again.
    RefreshToken,
    /// 429: wait out the advertised delay and go again.
    Backoff(Duration),
}

pub(crate) fn classify(
    status: StatusCode,
    retry_after: Option<&str>,
    can_refresh: bool,
) -> Disposition {
    if status == StatusCode::UNAUTHORIZED && can_refresh {
        return Disposition::RefreshToken;
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let delay = retry_after
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_BACKOFF);
        return Disposition::Backoff(delay);
    }
    Disposition::Return
}

enum CallState {
    Attempting,
    WaitingBackoff(Duration),
    RefreshingToken,
}

pub struct HttpCaller {
    client: Client,
    tokens: Arc<dyn TokenProvider>,
    max_retries: u32,
}

impl HttpCaller {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .user_agent(concat!("driveseek/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, tokens))
    }

    pub fn with_client(client: Client, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            tokens,
            max_retries: MAX_RETRIES,
        }
    }

    /// Issue a request, retrying within the bounded budget.
    ///
    /// Non-2xx responses that are neither 401 nor 429 are returned
    /// immediately; the caller decides what a 404 or 500 means for it.
    pub async fn call(
        &self,
        session: &Session,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Response, PipelineError> {
        let max_attempts = self.max_retries + 1;
        let mut attempts = 0u32;
        let mut state = CallState::Attempting;
        let mut held: Option<Response> = None;
        let mut last_transport: Option<reqwest::Error> = None;

        loop {
            state = match state {
                CallState::Attempting => {
                    if attempts >= max_attempts {
                        break;
                    }
                    attempts += 1;
                    match self.send(session, &method, url, body).await {
                        Err(err) => {
                            warn!(url, attempt = attempts, error = %err, "transport failure");
                            last_transport = Some(err);
                            CallState::Attempting
                        }
                        Ok(resp) => {
                            let retry_after = resp
                                .headers()
                                .get(header::RETRY_AFTER)
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string);
                            let can_refresh = session.account_id().is_some();
                            match classify(resp.status(), retry_after.as_deref(), can_refresh) {
                                Disposition::Return => {
                                    if resp.status().is_success() {
                                        debug!(url, status = %resp.status(), "request completed");
                                    } else {
                                        info!(url, status = %resp.status(), "request returned non-success status");
                                    }
                                    return Ok(resp);
                                }
                                Disposition::Backoff(delay) => {
                                    held = Some(resp);
                                    CallState::WaitingBackoff(delay)
                                }
                                Disposition::RefreshToken => {
                                    held = Some(resp);
                                    CallState::RefreshingToken
                                }
                            }
                        }
                    }
                }
                CallState::WaitingBackoff(delay) => {
                    warn!(url, delay_secs = delay.as_secs(), "rate limited; backing off");
                    tokio::time::sleep(delay).await;
                    CallState::Attempting
                }
                CallState::RefreshingToken => {
                    let refreshed = match session.account_id() {
                        Some(account) => self.tokens.refresh(account).await,
                        None => None,
                    };
                    match refreshed {
                        Some(bearer) => {
                            warn!(url, "received 401; bearer refreshed, retrying");
                            session.set_bearer(bearer).await;
                            CallState::Attempting
                        }
                        None => {
                            warn!(url, "received 401 and token refresh yielded no credential");
                            return held.take().map(Ok).unwrap_or_else(|| {
                                Err(PipelineError::Authentication(format!(
                                    "unauthorized with no refreshable credentials for {url}"
                                )))
                            });
                        }
                    }
                }
            };
        }

        if let Some(resp) = held {
            info!(url, status = %resp.status(), "attempt budget exhausted; returning last response");
            return Ok(resp);
        }
        match last_transport {
            Some(err) => Err(PipelineError::Http(err)),
            None => Err(PipelineError::RetriesExhausted(url.to_string())),
        }
    }

    async fn send(
        &self,
        session: &Session,
        method: &Method,
        url: &str,
        body: Option<&Value>,
    ) -> reqwest::Result<Response> {
        let bearer = session.bearer().await;
        let mut request = self.client.request(method.clone(), url).bearer_auth(bearer);
        if let Some(json) = body {
            request = request.json(json);
        }
        request.send().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_refreshes_only_with_an_account() {
        assert_eq!(
            classify(StatusCode::UNAUTHORIZED, None, true),
            Disposition::RefreshToken
        );
        assert_eq!(
            classify(StatusCode::UNAUTHORIZED, None, false),
            Disposition::Return
        );
    }

    #[test]
    fn rate_limit_honors_retry_after() {
        assert_eq!(
            classify(StatusCode::TOO_MANY_REQUESTS, Some("3"), true),
            Disposition::Backoff(Duration::from_secs(3))
        );
    }

    #[test]
    fn rate_limit_defaults_to_five_seconds() {
        assert_eq!(
            classify(StatusCode::TOO_MANY_REQUESTS, None, false),
            Disposition::Backoff(DEFAULT_BACKOFF)
        );
        assert_eq!(
            classify(StatusCode::TOO_MANY_REQUESTS, Some("soon"), false),
            Disposition::Backoff(DEFAULT_BACKOFF)
        );
    }

    #[test]
    fn other_statuses_return_immediately() {
        for status in [
            StatusCode::OK,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::FORBIDDEN,
        ] {
            assert_eq!(classify(status, None, true), Disposition::Return);
        }
    }
}
