//! Plain-text knowledge base answered through the chat collaborator.
//!
//! Documents are loaded from a directory once, persisted as a single JSON
//! file, and served as one combined context block. Rich-document
//! extraction (PDF, DOCX) is out of scope here; feed the directory text.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::PipelineError;
use crate::llm::ChatCompleter;

const ANSWER_SYSTEM_PROMPT: &str = "You are a helpful workplace assistant. Use the provided document contents \
to answer the user's question. Only answer from the given context; if the \
answer is not in the documents, say you do not know.";

#[derive(Debug, Default)]
pub struct KnowledgeBase {
    documents: BTreeMap<String, String>,
}

impl KnowledgeBase {
    /// Default location of the persisted knowledge base.
    pub fn default_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("driveseek").join("knowledge.json")
    }

    /// Read every `.txt`/`.md` file in a directory into the base.
    pub fn build_from_dir(dir: &Path) -> Result<Self, PipelineError> {
        let mut documents = BTreeMap::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            if !matches!(extension.as_str(), "txt" | "md") {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            match fs::read_to_string(&path) {
                Ok(text) if !text.trim().is_empty() => {
                    documents.insert(name, text.trim().to_string());
                }
                Ok(_) => {}
                Err(err) => warn!(file = %name, error = %err, "skipping unreadable document"),
            }
        }
        Ok(Self { documents })
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path)?;
        Ok(Self {
            documents: serde_json::from_str(&raw)?,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.documents)?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All documents joined into one context block.
    pub fn context(&self) -> String {
        self.documents
            .values()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Answer a question strictly from the stored documents.
    pub async fn answer<C: ChatCompleter + ?Sized>(
        &self,
        chat: &C,
        question: &str,
    ) -> Result<String, PipelineError> {
        if self.documents.is_empty() {
            return Err(PipelineError::InvalidInput(
                "knowledge base is empty; build it first".into(),
            ));
        }
        let prompt = format!(
            "User question: {question}\n\nDocument contents:\n{}",
            self.context()
        );
        chat.complete(ANSWER_SYSTEM_PROMPT, &prompt, 0.3).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_text_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("leave.txt"), "Annual leave is 25 days.\n").unwrap();
        fs::write(dir.path().join("onboarding.md"), "# Onboarding\nWeek one.").unwrap();
        fs::write(dir.path().join("photo.png"), [0u8, 1, 2]).unwrap();
        fs::write(dir.path().join("empty.txt"), "   \n").unwrap();

        let kb = KnowledgeBase::build_from_dir(dir.path()).unwrap();
        assert_eq!(kb.len(), 2);
        assert!(kb.context().contains("Annual leave is 25 days."));
        assert!(kb.context().contains("Week one."));
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("policy.txt"), "No smoking.").unwrap();
        let kb = KnowledgeBase::build_from_dir(dir.path()).unwrap();

        let path = dir.path().join("nested").join("knowledge.json");
        kb.save(&path).unwrap();
        let reloaded = KnowledgeBase::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.context(), "No smoking.");
    }
}
