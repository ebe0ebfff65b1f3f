//! Relevance ranking delegated to the LLM collaborator.
//!
//! The model returns a numbered free-text list which is parsed back into
//! an ordering of the candidate files. Parsing is tolerant and lossy by
//! contract: candidates the model never names are dropped, and parsed
//! names with no exact candidate match are reported, not silently eaten.

use tracing::debug;

use crate::error::PipelineError;
use crate::graph::FileItem;
use crate::llm::ChatCompleter;

/// How much of each file's surrogate text goes into the prompt.
pub const SURROGATE_PROMPT_CHARS: usize = 1000;

const RANK_SYSTEM_PROMPT: &str = "You are a document assistant. Rank the listed files by how closely \
each one matches the user's query.\n\
- Judge by exact relevance only, using both the file name and its content.\n\
- Do not infer recency or importance, and do not guess missing context.\n\
- Respond ONLY in this format:\n\
Ranked files:\n1. filename\n2. filename\n...";

/// The ranking step's typed result: an ordered subset of the candidates
/// plus the parsed names that matched nothing, kept for diagnostics.
#[derive(Debug)]
pub struct RankedOutput {
    pub ranked: Vec<FileItem>,
    pub unmatched: Vec<String>,
}

pub struct FileRanker<C> {
    chat: C,
    temperature: f32,
}

impl<C: ChatCompleter> FileRanker<C> {
    pub fn new(chat: C) -> Self {
        Self {
            chat,
            temperature: 0.2,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Rank candidates against the query. A failing completion call
    /// propagates; an un-ranked result is not silently returned.
    pub async fn rank(
        &self,
        query: &str,
        items: Vec<FileItem>,
        original_query: Option<&str>,
    ) -> Result<RankedOutput, PipelineError> {
        if items.is_empty() {
            return Ok(RankedOutput {
                ranked: items,
                unmatched: Vec::new(),
            });
        }
        let prompt = build_user_prompt(original_query.unwrap_or(query), &items);
        let content = self
            .chat
            .complete(RANK_SYSTEM_PROMPT, &prompt, self.temperature)
            .await?;
        debug!(chars = content.len(), "ranking response received");
        Ok(order_by_names(parse_ranked_names(&content), items))
    }
}

fn build_user_prompt(query: &str, items: &[FileItem]) -> String {
    let mut descriptions = String::new();
    for (index, item) in items.iter().enumerate() {
        let preview: String = item.surrogate().chars().take(SURROGATE_PROMPT_CHARS).collect();
        descriptions.push_str(&format!("{}. {}\n{}\n", index + 1, item.name, preview));
    }
    format!(
        "User query: {query}\n\nFiles:\n{descriptions}\n\
         Rank these files from most to least relevant based strictly on the query."
    )
}

/// Pull candidate filenames out of the model's numbered list.
///
/// A line qualifies when it is non-empty and contains at least one digit;
/// whatever follows the first `.` is the name.
pub(crate) fn parse_ranked_names(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || !line.chars().any(|c| c.is_ascii_digit()) {
                return None;
            }
            let (_, rest) = line.split_once('.')?;
            let name = rest.trim();
            if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

/// Reorder candidates to follow the parsed names.
///
/// Matching is exact and case-sensitive; the first not-yet-placed
/// candidate with that name wins. Candidates never named are dropped.
fn order_by_names(names: Vec<String>, items: Vec<FileItem>) -> RankedOutput {
    let mut slots: Vec<Option<FileItem>> = items.into_iter().map(Some).collect();
    let mut ranked = Vec::new();
    let mut unmatched = Vec::new();
    for name in names {
        let slot = slots
            .iter_mut()
            .find(|slot| matches!(slot, Some(item) if item.name == name));
        match slot {
            Some(slot) => {
                if let Some(item) = slot.take() {
                    ranked.push(item);
                }
            }
            None => unmatched.push(name),
        }
    }
    RankedOutput { ranked, unmatched }
}
