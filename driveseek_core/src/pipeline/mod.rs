//! The search pipeline: query → fan-out → enrich → summarize → rank.
//!
//! Every stage before ranking degrades by omission: a failing drive, site,
//! or item shrinks the result set instead of failing the query. Ranking is
//! the one stage whose errors propagate.

mod enrich;
mod query;
mod search;
mod summarize;

pub use enrich::enrich;
pub use query::SearchQuery;
pub use search::fan_out_search;
pub use summarize::{summarize, NoExtraction, TextExtractor};

use tracing::info;

use crate::auth::Session;
use crate::error::PipelineError;
use crate::graph::DriveSource;
use crate::llm::ChatCompleter;
use crate::ranker::{FileRanker, RankedOutput};

/// Hard cap on concurrently outstanding remote calls, shared by fan-out
/// search and metadata enrichment.
pub const MAX_CONCURRENCY: usize = 30;

/// Ties the pipeline stages together over a drive source, a ranking
/// completer, and a text extractor.
pub struct FileFinder<G, C, E> {
    source: G,
    ranker: FileRanker<C>,
    extractor: E,
}

impl<G, C, E> FileFinder<G, C, E>
where
    G: DriveSource,
    C: ChatCompleter,
    E: TextExtractor,
{
    pub fn new(source: G, ranker: FileRanker<C>, extractor: E) -> Self {
        Self {
            source,
            ranker,
            extractor,
        }
    }

    pub fn source(&self) -> &G {
        &self.source
    }

    /// Run one query through the whole pipeline.
    pub async fn run(
        &self,
        session: &Session,
        raw_query: &str,
    ) -> Result<RankedOutput, PipelineError> {
        let query = SearchQuery::parse(raw_query);
        info!(raw = %query.raw, normalized = %query.normalized, "starting file search");

        let found = fan_out_search(&self.source, session, &query).await;
        let mut candidates = enrich(&self.source, session, found).await;
        summarize(&self.extractor, &mut candidates).await;
        info!(count = candidates.len(), "candidates ready for ranking");

        self.ranker
            .rank(&query.normalized, candidates, Some(&query.raw))
            .await
    }
}
