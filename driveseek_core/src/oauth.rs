//! Microsoft identity platform flows: device-code sign-in and the
//! refresh-token grant used by [`crate::auth::StoredTokenProvider`].

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;

const LOGIN_BASE: &str = "https://login.microsoftonline.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAuthStart {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default = "default_device_expiry")]
    pub expires_in: i64,
    #[serde(default)]
    pub interval: Option<u64>,
}

fn default_device_expiry() -> i64 {
    900
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn tenant_or_common(tenant_id: &str) -> &str {
    if tenant_id.is_empty() {
        "common"
    } else {
        tenant_id
    }
}

fn device_code_url(tenant_id: &str) -> String {
    format!(
        "{LOGIN_BASE}/{}/oauth2/v2.0/devicecode",
        tenant_or_common(tenant_id)
    )
}

fn token_url(tenant_id: &str) -> String {
    format!(
        "{LOGIN_BASE}/{}/oauth2/v2.0/token",
        tenant_or_common(tenant_id)
    )
}

/// Start a device-code sign-in; the user enters the code at the
/// verification URL while the caller polls [`device_poll`].
pub async fn device_authorize(
    client: &Client,
    tenant_id: &str,
    client_id: &str,
    scopes: &str,
) -> Result<DeviceAuthStart, PipelineError> {
    let form = [("client_id", client_id), ("scope", scopes)];
    let resp = client
        .post(device_code_url(tenant_id))
        .form(&form)
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(PipelineError::Authentication(format!(
            "device authorize failed ({status}): {body}"
        )));
    }
    Ok(resp.json().await?)
}

/// Poll the token endpoint for a pending device-code sign-in.
///
/// Returns `Ok(None)` while the user has not completed the flow yet.
pub async fn device_poll(
    client: &Client,
    tenant_id: &str,
    client_id: &str,
    device_code: &str,
) -> Result<Option<OAuthTokens>, PipelineError> {
    let form = [
        ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
        ("client_id", client_id),
        ("device_code", device_code),
    ];
    let resp = client.post(token_url(tenant_id)).form(&form).send().await?;
    let status = resp.status();
    let body: Value = resp.json().await?;
    if status.is_success() {
        return Ok(Some(serde_json::from_value(body)?));
    }
    match body.get("error").and_then(|e| e.as_str()) {
        Some("authorization_pending") | Some("slow_down") => Ok(None),
        _ => Err(PipelineError::Authentication(format!(
            "device sign-in failed: {body}"
        ))),
    }
}

/// Exchange a refresh token for a fresh access token.
pub async fn refresh_token_grant(
    client: &Client,
    tenant_id: &str,
    client_id: &str,
    client_secret: Option<&str>,
    refresh_token: &str,
) -> Result<OAuthTokens, PipelineError> {
    let mut form = vec![
        ("grant_type", "refresh_token".to_string()),
        ("client_id", client_id.to_string()),
        ("refresh_token", refresh_token.to_string()),
    ];
    if let Some(secret) = client_secret {
        if !secret.is_empty() {
            form.push(("client_secret", secret.to_string()));
        }
    }
    let resp = client.post(token_url(tenant_id)).form(&form).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(PipelineError::Authentication(format!(
            "token refresh failed ({status}): {body}"
        )));
    }
    Ok(resp.json().await?)
}
