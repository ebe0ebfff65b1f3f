use std::time::Duration;

use owo_colors::OwoColorize;
use tokio::time::Instant;

use driveseek_core::auth_store::{CachedTokens, FileTokenStore, TokenStore};
use driveseek_core::oauth;

use super::{load_config, CliError, Result};
use crate::cli::Cli;

pub async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?.graph;
    let client = reqwest::Client::new();

    let start = oauth::device_authorize(
        &client,
        &config.tenant_id,
        &config.client_id,
        &config.scopes,
    )
    .await?;

    println!(
        "To sign in, open {} and enter the code {}",
        start.verification_uri.bold(),
        start.user_code.cyan().bold()
    );

    let interval = Duration::from_secs(start.interval.unwrap_or(5));
    let deadline = Instant::now() + Duration::from_secs(start.expires_in.max(0) as u64);

    loop {
        if Instant::now() >= deadline {
            return Err(CliError::Message("sign-in timed out".into()));
        }
        tokio::time::sleep(interval).await;
        if let Some(tokens) = oauth::device_poll(
            &client,
            &config.tenant_id,
            &config.client_id,
            &start.device_code,
        )
        .await?
        {
            let store = FileTokenStore::new_default();
            store.save(&cli.account, &CachedTokens::from_grant(&tokens))?;
            println!(
                "{} signed in; tokens cached for account '{}'",
                "ok:".green().bold(),
                cli.account
            );
            return Ok(());
        }
    }
}
