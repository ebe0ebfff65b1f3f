//! Chat-completion collaborator and intent routing.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::config::RankerConfig;
use crate::error::PipelineError;
use crate::http::REQUEST_TIMEOUT;

/// Black-box text completion boundary. The ranker and the intent router
/// only see this trait.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, PipelineError>;
}

/// Chat-completions client for Perplexity-style endpoints.
pub struct SonarClient {
    client: Client,
    config: RankerConfig,
}

impl SonarClient {
    pub fn new(config: RankerConfig) -> Result<Self, PipelineError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChatCompleter for SonarClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, PipelineError> {
        let body = json!({
            "model": self.config.model_name,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": temperature,
        });
        let url = self.completions_url();
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            warn!(%status, detail = %detail, "completion call failed");
            return Err(PipelineError::Status { status, url });
        }
        let payload: Value = resp.json().await?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                PipelineError::MalformedResponse("completion response missing content".into())
            })?;
        Ok(content.trim().to_string())
    }
}

/// What the user wants from a free-text request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "HR_Admin", alias = "hr_admin")]
    HrAdmin,
    #[serde(rename = "file_search")]
    FileSearch,
    #[serde(rename = "general_response", alias = "general")]
    GeneralResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,
    /// Cleaned query or keywords extracted from the input; may be empty.
    #[serde(default)]
    pub data: String,
}

const INTENT_SYSTEM_PROMPT: &str = "You are an intent classifier for a workplace assistant. Classify the user \
input into one of these intents:\n\
- HR_Admin: questions about HR policies, leave, IDs, benefits, holidays, onboarding, payroll.\n\
- file_search: the user is asking to search, find, retrieve or preview a document or file.\n\
- general_response: greetings, chitchat, thanks, or anything unrelated.\n\n\
Respond strictly with JSON of the form:\n\
{\"intent\": \"intent_name\", \"data\": \"cleaned relevant keyword(s) or query\"}\n\
Output must be valid JSON only, with no extra explanation.";

/// Classify a free-text request, falling back to keyword rules when the
/// model call fails or returns something unparseable.
pub async fn classify_intent<C: ChatCompleter + ?Sized>(chat: &C, input: &str) -> IntentResult {
    match classify_intent_llm(chat, input).await {
        Ok(result) => result,
        Err(err) => {
            warn!(error = %err, "intent classification fell back to rules");
            classify_intent_rules(input)
        }
    }
}

async fn classify_intent_llm<C: ChatCompleter + ?Sized>(
    chat: &C,
    input: &str,
) -> Result<IntentResult, PipelineError> {
    let content = chat.complete(INTENT_SYSTEM_PROMPT, input, 0.2).await?;
    Ok(serde_json::from_str(content.trim())?)
}

pub(crate) fn classify_intent_rules(input: &str) -> IntentResult {
    const SMALL_TALK: &[&str] = &[
        "hi",
        "hello",
        "how are you",
        "thank you",
        "what can you do",
        "who are you",
        "good morning",
        "good evening",
        "hey",
        "help",
    ];
    const FILE_KEYWORDS: &[&str] = &["file", "document", "report", "sheet", "policy"];

    let lower = input.trim().to_lowercase();
    if SMALL_TALK.iter().any(|phrase| lower.contains(phrase)) {
        return IntentResult {
            intent: Intent::GeneralResponse,
            data: input.to_string(),
        };
    }
    for keyword in FILE_KEYWORDS {
        if lower.contains(keyword) {
            return IntentResult {
                intent: Intent::FileSearch,
                data: lower.replace(keyword, "").trim().to_string(),
            };
        }
    }
    IntentResult {
        intent: Intent::GeneralResponse,
        data: input.to_string(),
    }
}

/// Answer a conversational query with no document context.
pub async fn answer_general<C: ChatCompleter + ?Sized>(
    chat: &C,
    input: &str,
) -> Result<String, PipelineError> {
    chat.complete(
        "You are a helpful assistant. Answer casually and clearly.",
        input,
        0.7,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_fallback_spots_file_requests() {
        let result = classify_intent_rules("find the expense report from last month");
        assert_eq!(result.intent, Intent::FileSearch);
        assert_eq!(result.data, "find the expense  from last month");
    }

    #[test]
    fn rule_fallback_prefers_small_talk() {
        // "help" wins even though no file keyword is present
        let result = classify_intent_rules("help");
        assert_eq!(result.intent, Intent::GeneralResponse);
    }

    #[test]
    fn rule_fallback_defaults_to_general() {
        let result = classify_intent_rules("what's the weather in Lisbon");
        assert_eq!(result.intent, Intent::GeneralResponse);
        assert_eq!(result.data, "what's the weather in Lisbon");
    }

    #[test]
    fn intent_json_parses_both_spellings() {
        let a: IntentResult =
            serde_json::from_str(r#"{"intent": "HR_Admin", "data": "leave policy"}"#).unwrap();
        assert_eq!(a.intent, Intent::HrAdmin);
        let b: IntentResult =
            serde_json::from_str(r#"{"intent": "hr_admin", "data": ""}"#).unwrap();
        assert_eq!(b.intent, Intent::HrAdmin);
        let c: IntentResult =
            serde_json::from_str(r#"{"intent": "file_search", "data": "2024 budget"}"#).unwrap();
        assert_eq!(c.intent, Intent::FileSearch);
    }
}
