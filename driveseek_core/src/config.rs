//! Explicit configuration for the Graph client and the ranking LLM.
//!
//! Nothing here is read at import time; components receive their config at
//! construction. Values come from the environment or from a TOML file.

use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::PipelineError;

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_RANKER_BASE_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_RANKER_MODEL: &str = "sonar-pro";
pub const DEFAULT_SCOPES: &str =
    "offline_access User.Read Files.Read.All Sites.Read.All Mail.Send";
const DEFAULT_RANK_TEMPERATURE: f32 = 0.2;

fn default_graph_base_url() -> String {
    DEFAULT_GRAPH_BASE_URL.to_string()
}

fn default_tenant() -> String {
    "common".to_string()
}

fn default_scopes() -> String {
    DEFAULT_SCOPES.to_string()
}

fn default_ranker_base_url() -> String {
    DEFAULT_RANKER_BASE_URL.to_string()
}

fn default_ranker_model() -> String {
    DEFAULT_RANKER_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_RANK_TEMPERATURE
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

/// Connection settings for the storage API and the token endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_base_url")]
    pub base_url: String,
    #[serde(default = "default_tenant")]
    pub tenant_id: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_scopes")]
    pub scopes: String,
    #[serde(default)]
    pub perform_access_check: bool,
}

impl GraphConfig {
    pub fn from_env() -> Result<Self, PipelineError> {
        let config = Self {
            base_url: env_or("GRAPH_BASE_URL", DEFAULT_GRAPH_BASE_URL),
            tenant_id: env_or("GRAPH_TENANT_ID", "common"),
            client_id: std::env::var("GRAPH_CLIENT_ID")
                .map_err(|_| PipelineError::Config("GRAPH_CLIENT_ID is not set".into()))?,
            client_secret: std::env::var("GRAPH_CLIENT_SECRET").ok(),
            scopes: env_or("GRAPH_SCOPES", DEFAULT_SCOPES),
            perform_access_check: std::env::var("PERFORM_ACCESS_CHECK")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<(), PipelineError> {
        Url::parse(&self.base_url).map_err(|e| {
            PipelineError::Config(format!("invalid graph base URL '{}': {}", self.base_url, e))
        })?;
        Ok(())
    }
}

/// Settings for the ranking/classification LLM endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RankerConfig {
    pub api_key: String,
    #[serde(default = "default_ranker_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_ranker_model")]
    pub model_name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl RankerConfig {
    pub fn from_env() -> Result<Self, PipelineError> {
        let config = Self {
            api_key: std::env::var("PPLX_API_KEY")
                .map_err(|_| PipelineError::Config("PPLX_API_KEY is not set".into()))?,
            api_base_url: env_or("PPLX_API_URL", DEFAULT_RANKER_BASE_URL),
            model_name: env_or("PPLX_MODEL", DEFAULT_RANKER_MODEL),
            temperature: std::env::var("PPLX_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RANK_TEMPERATURE),
        };
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<(), PipelineError> {
        Url::parse(&self.api_base_url).map_err(|e| {
            PipelineError::Config(format!(
                "invalid ranker base URL '{}': {}",
                self.api_base_url, e
            ))
        })?;
        Ok(())
    }
}

/// Top-level config as loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveseekConfig {
    pub graph: GraphConfig,
    pub ranker: RankerConfig,
}

impl DriveseekConfig {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.graph.validate()?;
        config.ranker.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, PipelineError> {
        Ok(Self {
            graph: GraphConfig::from_env()?,
            ranker: RankerConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_config_fills_defaults() {
        let raw = r#"
            [graph]
            client_id = "11111111-2222-3333-4444-555555555555"

            [ranker]
            api_key = "pplx-test"
        "#;
        let config: DriveseekConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.graph.base_url, DEFAULT_GRAPH_BASE_URL);
        assert_eq!(config.graph.tenant_id, "common");
        assert!(!config.graph.perform_access_check);
        assert_eq!(config.ranker.model_name, DEFAULT_RANKER_MODEL);
        assert_eq!(config.ranker.api_base_url, DEFAULT_RANKER_BASE_URL);
        assert!((config.ranker.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let config = GraphConfig {
            base_url: "not a url".into(),
            tenant_id: "common".into(),
            client_id: "c".into(),
            client_secret: None,
            scopes: DEFAULT_SCOPES.into(),
            perform_access_check: false,
        };
        assert!(config.validate().is_err());
    }
}
