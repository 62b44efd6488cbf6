//! Staged passage retrieval.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use ulid::Ulid;

use juris_core::{RetrievedPassage, Store};

use crate::keywords::keyword_expression;

/// A single retrieval stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalStrategy {
    /// Ranked FTS match against the given expression.
    Ranked(String),

    /// Unranked sample of the matter's passages.
    Sample,
}

/// Build the strategy chain for a question.
///
/// Questions that yield keyword terms get a ranked stage followed by
/// the sample fallback; questions with no usable terms go straight to
/// the sample.
pub fn plan(question: &str) -> Vec<RetrievalStrategy> {
    match keyword_expression(question) {
        Some(expression) => vec![
            RetrievalStrategy::Ranked(expression),
            RetrievalStrategy::Sample,
        ],
        None => vec![RetrievalStrategy::Sample],
    }
}

/// Staged passage retriever.
///
/// Walks the strategy chain and returns the first stage that produces
/// passages. Retrieval never fails outwardly: a stage that errors is
/// logged and skipped, and an exhausted chain yields an empty result.
pub struct Retriever<S> {
    /// Storage backend.
    store: Arc<S>,
}

impl<S> Retriever<S>
where
    S: Store + Send + Sync,
{
    /// Create a new retriever.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Retrieve passages for a question against a matter.
    pub async fn retrieve(
        &self,
        matter_id: Ulid,
        question: &str,
        limit: usize,
    ) -> Vec<RetrievedPassage> {
        let start = Instant::now();

        for strategy in plan(question) {
            match strategy {
                RetrievalStrategy::Ranked(expression) => {
                    match self
                        .store
                        .keyword_search(matter_id, &expression, limit)
                        .await
                    {
                        Ok(passages) if !passages.is_empty() => {
                            info!(
                                "Ranked retrieval returned {} passages in {}ms",
                                passages.len(),
                                start.elapsed().as_millis()
                            );
                            return passages;
                        }
                        Ok(_) => {
                            debug!("Ranked retrieval matched nothing, falling back to sample");
                        }
                        Err(e) => {
                            warn!("Ranked retrieval failed, falling back to sample: {}", e);
                        }
                    }
                }
                RetrievalStrategy::Sample => match self.store.sample_passages(matter_id, limit).await {
                    Ok(passages) => {
                        info!(
                            "Sample retrieval returned {} passages in {}ms",
                            passages.len(),
                            start.elapsed().as_millis()
                        );
                        return passages;
                    }
                    Err(e) => {
                        warn!("Sample retrieval failed: {}", e);
                    }
                },
            }
        }

        Vec::new()
    }
}
