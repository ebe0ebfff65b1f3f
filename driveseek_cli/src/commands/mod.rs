pub mod ask;
pub mod auth;
pub mod kb;
pub mod search;

use std::sync::Arc;

use driveseek_core::auth_store::StoreError;
use driveseek_core::{
    DriveseekConfig, FileTokenStore, GraphConfig, PipelineError, Session, StoredTokenProvider,
};

use crate::cli::Cli;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] PipelineError),
    #[error("token store error: {0}")]
    Store(#[from] StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, CliError>;

pub(crate) fn load_config(cli: &Cli) -> Result<DriveseekConfig> {
    match &cli.config {
        Some(path) => Ok(DriveseekConfig::load(path)?),
        None => Ok(DriveseekConfig::from_env()?),
    }
}

/// Open a session for the CLI account from the on-disk token cache.
pub(crate) async fn open_session(
    config: &GraphConfig,
    account: &str,
) -> Result<(Arc<StoredTokenProvider>, Session)> {
    let store = Arc::new(FileTokenStore::new_default());
    let provider = Arc::new(StoredTokenProvider::new(store, config.clone()));
    match Session::for_account(provider.as_ref(), account).await {
        Ok(session) => Ok((provider, session)),
        Err(_) => Err(CliError::Message(format!(
            "no cached credentials for account '{account}'; run `driveseek auth` first"
        ))),
    }
}
