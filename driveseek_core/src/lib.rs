// src/lib.rs
//! driveseek: federated file discovery across OneDrive and SharePoint,
//! with relevance ranking delegated to an LLM.
//!
//! The pipeline runs strictly downstream: query normalization, site/drive
//! discovery, bounded fan-out search, metadata enrichment, content
//! summarization, and finally LLM ranking. Discovery, search, and
//! enrichment degrade by omission; ranking failures propagate to the
//! caller.

pub mod auth;
pub mod auth_store;
pub mod config;
pub mod error;
pub mod graph;
pub mod http;
pub mod kb;
pub mod llm;
pub mod oauth;
pub mod pipeline;
pub mod ranker;

pub use auth::{Session, StoredTokenProvider, TokenProvider};
pub use auth_store::{CachedTokens, FileTokenStore, MemoryTokenStore, TokenStore};
pub use config::{DriveseekConfig, GraphConfig, RankerConfig};
pub use error::PipelineError;
pub use graph::{
    Drive, DriveSource, FileItem, GraphClient, Page, ParentReference, Site, PERSONAL_SITE_ID,
};
pub use http::HttpCaller;
pub use kb::KnowledgeBase;
pub use llm::{answer_general, classify_intent, ChatCompleter, Intent, IntentResult, SonarClient};
pub use pipeline::{
    enrich, fan_out_search, summarize, FileFinder, NoExtraction, SearchQuery, TextExtractor,
    MAX_CONCURRENCY,
};
pub use ranker::{FileRanker, RankedOutput};
