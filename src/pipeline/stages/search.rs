use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::SearchHit,
    pipeline::{
        stages::{Stage, StageName},
        state::{PipelineState, StateField, StateUpdate},
    },
    services::providers::SearchTool,
};

/// Runs the current search query, falling back to alternative queries when it finds nothing
pub struct SearchStage {
    search: Arc<dyn SearchTool>,
    result_limit: usize,
    min_relevance_score: f32,
}

impl SearchStage {
    pub fn new(search: Arc<dyn SearchTool>, result_limit: usize, min_relevance_score: f32) -> Self {
        Self {
            search,
            result_limit,
            min_relevance_score,
        }
    }

    /// Top-ranked snippets above the relevance floor; a failing search counts as no results
    async fn relevant_snippets(&self, query: &str) -> Vec<String> {
        let hits = match self.search.search(query).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    query = %query,
                    provider = self.search.name(),
                    "Search failed, treating as no results"
                );
                return Vec::new();
            }
        };

        filter_hits(hits, self.result_limit, self.min_relevance_score)
    }
}

fn filter_hits(hits: Vec<SearchHit>, limit: usize, min_score: f32) -> Vec<String> {
    hits.into_iter()
        .take(limit)
        .filter(|hit| hit.score >= min_score)
        .map(|hit| hit.content)
        .collect()
}

#[async_trait::async_trait]
impl Stage for SearchStage {
    fn name(&self) -> StageName {
        StageName::Search
    }

    fn requires(&self) -> &'static [StateField] {
        &[StateField::SearchQuery]
    }

    async fn run(&self, state: &PipelineState) -> AppResult<StateUpdate> {
        let primary = state
            .search_query
            .as_deref()
            .ok_or_else(|| AppError::Pipeline("search query missing".to_string()))?;

        let mut snippets = self.relevant_snippets(primary).await;

        for alternative in &state.alternative_search_queries {
            if !snippets.is_empty() {
                break;
            }
            tracing::info!(query = %alternative, "Primary query found nothing, trying alternative");
            snippets = self.relevant_snippets(alternative).await;
        }

        tracing::info!(
            query = %primary,
            results = snippets.len(),
            retry_count = state.retry_count,
            "Search completed"
        );

        Ok(StateUpdate {
            raw_search_results: Some(snippets),
            ..Default::default()
        })
    }
}
