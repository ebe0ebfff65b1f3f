use owo_colors::OwoColorize;

use driveseek_core::{KnowledgeBase, SonarClient};

use super::{load_config, Result};
use crate::cli::{Cli, KbAction};

pub async fn run(cli: &Cli, action: &KbAction) -> Result<()> {
    match action {
        KbAction::Build { dir } => {
            let kb = KnowledgeBase::build_from_dir(dir)?;
            let path = KnowledgeBase::default_path();
            kb.save(&path)?;
            println!(
                "{} indexed {} document(s) into {}",
                "ok:".green().bold(),
                kb.len(),
                path.display()
            );
            Ok(())
        }
        KbAction::Ask { question } => {
            let config = load_config(cli)?;
            let chat = SonarClient::new(config.ranker.clone())?;
            let kb = KnowledgeBase::load(&KnowledgeBase::default_path())?;
            println!("{}", kb.answer(&chat, question).await?);
            Ok(())
        }
    }
}
