//! Account sessions and the token provider boundary.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::auth_store::{CachedTokens, TokenStore};
use crate::config::GraphConfig;
use crate::error::PipelineError;
use crate::oauth;

/// Produces bearer credentials for a given account identity.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Produce a bearer token for the account, refreshing on expiry.
    ///
    /// Idempotent and safe to call repeatedly. Returns `None` when the
    /// account has no usable credentials; failures are logged, not raised.
    async fn refresh(&self, account_id: &str) -> Option<String>;
}

/// Token provider backed by a persistent [`TokenStore`].
///
/// An unexpired cached access token is returned as-is; otherwise the cached
/// refresh token is exchanged at the identity endpoint and the result is
/// written back to the store.
pub struct StoredTokenProvider {
    store: Arc<dyn TokenStore>,
    config: GraphConfig,
    http: Client,
}

impl StoredTokenProvider {
    pub fn new(store: Arc<dyn TokenStore>, config: GraphConfig) -> Self {
        Self {
            store,
            config,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl TokenProvider for StoredTokenProvider {
    async fn refresh(&self, account_id: &str) -> Option<String> {
        let cached = self.store.load(account_id)?;
        if cached.is_fresh() {
            debug!(account_id, "cached access token still valid");
            return Some(cached.access_token);
        }
        let refresh_token = match cached.refresh_token.as_deref() {
            Some(token) => token,
            None => {
                warn!(account_id, "access token expired and no refresh token cached");
                return None;
            }
        };
        let grant = match oauth::refresh_token_grant(
            &self.http,
            &self.config.tenant_id,
            &self.config.client_id,
            self.config.client_secret.as_deref(),
            refresh_token,
        )
        .await
        {
            Ok(grant) => grant,
            Err(err) => {
                warn!(account_id, error = %err, "token refresh failed");
                return None;
            }
        };
        let mut next = CachedTokens::from_grant(&grant);
        // The endpoint may omit a rotated refresh token; keep the old one.
        if next.refresh_token.is_none() {
            next.refresh_token = cached.refresh_token.clone();
        }
        if let Err(err) = self.store.save(account_id, &next) {
            warn!(account_id, error = %err, "failed to persist refreshed tokens");
        }
        Some(next.access_token)
    }
}

/// The credential state shared by every concurrent call of one query.
///
/// A single 401-triggered refresh replaces the bearer for all in-flight
/// workers at once.
pub struct Session {
    account_id: Option<String>,
    bearer: RwLock<String>,
}

impl Session {
    pub fn new(account_id: Option<String>, bearer: String) -> Self {
        Self {
            account_id,
            bearer: RwLock::new(bearer),
        }
    }

    /// Open a session for an account, failing when no credentials exist.
    pub async fn for_account(
        provider: &dyn TokenProvider,
        account_id: &str,
    ) -> Result<Self, PipelineError> {
        match provider.refresh(account_id).await {
            Some(bearer) => Ok(Self::new(Some(account_id.to_string()), bearer)),
            None => Err(PipelineError::Authentication(format!(
                "no usable credentials for account '{account_id}'"
            ))),
        }
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub async fn bearer(&self) -> String {
        self.bearer.read().await.clone()
    }

    pub async fn set_bearer(&self, bearer: String) {
        *self.bearer.write().await = bearer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_store::MemoryTokenStore;
    use crate::config::DEFAULT_SCOPES;
    use chrono::Utc;

    fn test_config() -> GraphConfig {
        GraphConfig {
            base_url: crate::config::DEFAULT_GRAPH_BASE_URL.into(),
            tenant_id: "common".into(),
            client_id: "client".into(),
            client_secret: None,
            scopes: DEFAULT_SCOPES.into(),
            perform_access_check: false,
        }
    }

    #[tokio::test]
    async fn fresh_cached_token_is_returned_without_network() {
        let store = Arc::new(MemoryTokenStore::new());
        store
            .save(
                "alice",
                &CachedTokens {
                    access_token: "cached".into(),
                    refresh_token: Some("rt".into()),
                    expires_at: Some(Utc::now().timestamp() + 3600),
                },
            )
            .unwrap();
        let provider = StoredTokenProvider::new(store, test_config());
        assert_eq!(provider.refresh("alice").await.as_deref(), Some("cached"));
    }

    #[tokio::test]
    async fn unknown_account_yields_none() {
        let provider =
            StoredTokenProvider::new(Arc::new(MemoryTokenStore::new()), test_config());
        assert!(provider.refresh("nobody").await.is_none());
    }

    #[tokio::test]
    async fn expired_without_refresh_token_yields_none() {
        let store = Arc::new(MemoryTokenStore::new());
        store
            .save(
                "bob",
                &CachedTokens {
                    access_token: "stale".into(),
                    refresh_token: None,
                    expires_at: Some(0),
                },
            )
            .unwrap();
        let provider = StoredTokenProvider::new(store, test_config());
        assert!(provider.refresh("bob").await.is_none());
    }

    #[tokio::test]
    async fn session_swaps_bearer_in_place() {
        let session = Session::new(Some("alice".into()), "one".into());
        assert_eq!(session.bearer().await, "one");
        session.set_bearer("two".into()).await;
        assert_eq!(session.bearer().await, "two");
        assert_eq!(session.account_id(), Some("alice"));
    }
}
