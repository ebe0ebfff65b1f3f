use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "driveseek",
    version,
    about = "Search OneDrive and SharePoint, ranked by an LLM"
)]
pub struct Cli {
    /// Path to a TOML config file; environment variables are used when absent.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Account identity whose cached tokens are used.
    #[arg(long, global = true, default_value = "default")]
    pub account: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with the Microsoft device-code flow and cache tokens.
    Auth,
    /// Search the personal drive and every visible site, ranked by relevance.
    Search {
        query: String,
        /// Print the ranked result as JSON.
        #[arg(long)]
        json: bool,
        /// Mail the ranked file links to this address.
        #[arg(long)]
        email_to: Option<String>,
    },
    /// Route a free-text request: file search, knowledge base, or chat.
    Ask { input: String },
    /// Knowledge base maintenance and questions.
    Kb {
        #[command(subcommand)]
        action: KbAction,
    },
}

#[derive(Subcommand)]
pub enum KbAction {
    /// Build the knowledge base from a directory of text documents.
    Build { dir: PathBuf },
    /// Answer a question from the stored knowledge base.
    Ask { question: String },
}
