use owo_colors::OwoColorize;
use tracing::debug;

use driveseek_core::{
    FileFinder, FileRanker, GraphClient, HttpCaller, NoExtraction, SonarClient,
};

use super::{load_config, open_session, Result};
use crate::cli::Cli;

pub async fn run(cli: &Cli, query: &str, json: bool, email_to: Option<&str>) -> Result<()> {
    let config = load_config(cli)?;
    let (provider, session) = open_session(&config.graph, &cli.account).await?;

    let http = HttpCaller::new(provider)?;
    let graph = GraphClient::new(http, config.graph.clone());
    let ranker = FileRanker::new(SonarClient::new(config.ranker.clone())?)
        .with_temperature(config.ranker.temperature);
    let finder = FileFinder::new(graph, ranker, NoExtraction);

    let output = finder.run(&session, query).await?;
    if !output.unmatched.is_empty() {
        debug!(unmatched = ?output.unmatched, "ranker named files outside the candidate set");
    }

    let mut ranked = output.ranked;
    if config.graph.perform_access_check {
        let graph = finder.source();
        let mut accessible = Vec::new();
        for item in ranked {
            if graph
                .check_file_access(&session, &item.id, item.site_id())
                .await
            {
                accessible.push(item);
            } else {
                debug!(item = %item.id, "dropped by access check");
            }
        }
        ranked = accessible;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else if ranked.is_empty() {
        println!("{}", "No matching files found.".dimmed());
    } else {
        for (index, item) in ranked.iter().enumerate() {
            println!(
                "{:>3}. {}  {}",
                index + 1,
                item.name.bold(),
                item.web_url.as_deref().unwrap_or("").dimmed()
            );
        }
    }

    if let Some(to) = email_to {
        if ranked.is_empty() {
            println!("{}", "Nothing to mail.".dimmed());
        } else if finder
            .source()
            .send_files_notification(&session, to, &ranked)
            .await?
        {
            println!("{} mailed {} file link(s) to {}", "ok:".green().bold(), ranked.len(), to);
        } else {
            println!("{} mail was not accepted; see logs", "warning:".yellow().bold());
        }
    }

    Ok(())
}
