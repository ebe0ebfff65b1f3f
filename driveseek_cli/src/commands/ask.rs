use driveseek_core::{answer_general, classify_intent, Intent, KnowledgeBase, SonarClient};

use super::{load_config, search, Result};
use crate::cli::Cli;

/// Route a free-text request by intent: file search, knowledge base, or
/// plain chat.
pub async fn run(cli: &Cli, input: &str) -> Result<()> {
    let config = load_config(cli)?;
    let chat = SonarClient::new(config.ranker.clone())?;

    let result = classify_intent(&chat, input).await;
    match result.intent {
        Intent::FileSearch => {
            let query = if result.data.is_empty() {
                input
            } else {
                result.data.as_str()
            };
            search::run(cli, query, false, None).await
        }
        Intent::HrAdmin => {
            let kb = KnowledgeBase::load(&KnowledgeBase::default_path())?;
            println!("{}", kb.answer(&chat, input).await?);
            Ok(())
        }
        Intent::GeneralResponse => {
            println!("{}", answer_general(&chat, input).await?);
            Ok(())
        }
    }
}
