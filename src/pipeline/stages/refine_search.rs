use std::sync::Arc;

use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{GameRecord, SearchStrategy},
    pipeline::{
        stages::{Stage, StageName},
        state::{PipelineState, StateField, StateUpdate},
    },
    services::llm::{complete_json, FieldSpec, JsonShape, LlmTask, Prompt, StructuredModel},
};

const REFINEMENT_SHAPE: JsonShape = JsonShape {
    fields: &[
        FieldSpec::new("primarySearchQuery", "string"),
        FieldSpec::new("alternativeQueries", "array of string"),
        FieldSpec::new("newStrategy", "one of \"standard\", \"broad\", \"specific\""),
        FieldSpec::new("reasoning", "string"),
    ],
};

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Refinement {
    primary_search_query: String,
    #[serde(default)]
    alternative_queries: Vec<String>,
    new_strategy: SearchStrategy,
    #[serde(default)]
    reasoning: String,
}

/// Fixed two-step policy used when the model cannot refine the search
fn fallback_refinement(state: &PipelineState) -> Refinement {
    let query = state
        .search_query
        .as_deref()
        .unwrap_or(state.user_request.as_str());

    if state.retry_count == 0 {
        Refinement {
            primary_search_query: format!("best games {} recommendations reviews", query),
            alternative_queries: vec![
                format!("top {} games", query),
                format!("{} game suggestions", query),
            ],
            new_strategy: SearchStrategy::Broad,
            reasoning: "Broadening search for more results".to_string(),
        }
    } else {
        Refinement {
            primary_search_query: format!("games for {} fans", query),
            alternative_queries: vec![
                format!("{} similar games like", query),
                format!("{} genre games", query),
            ],
            new_strategy: SearchStrategy::Specific,
            reasoning: "Trying alternative search approach".to_string(),
        }
    }
}

fn refinement_prompt(state: &PipelineState) -> Prompt {
    let issues = state
        .quality_assessment
        .as_ref()
        .filter(|a| !a.issues.is_empty())
        .map(|a| a.issues.join(", "))
        .unwrap_or_else(|| "No specific issues".to_string());

    let text = format!(
        "You are an expert at refining search strategies for game recommendations when initial results are insufficient.

Original User Request: {request}
Previous Search Query: {query}
Search Strategy: {strategy}
Issues Found: {issues}
Retry Count: {retry_count}

Based on the issues and strategy, generate improved search approaches:
1. If strategy is \"broad\", create more specific, targeted queries
2. If strategy is \"specific\", create broader, more inclusive queries
3. If strategy is \"standard\", adapt based on the specific issues

Guidelines for refinement:
- If insufficient results: broaden the search with more general terms
- If irrelevant results: add more specific constraints and keywords
- If missing specific genres: include genre-specific terms
- If missing platforms: add platform-specific searches
- Use synonyms and alternative phrasings
- Consider different search angles (reviews, lists, comparisons)",
        request = state.user_request,
        query = state.search_query.as_deref().unwrap_or("No previous query"),
        strategy = state.search_strategy.as_str(),
        issues = issues,
        retry_count = state.retry_count,
    );
    Prompt::json(LlmTask::RefineSearch, text, &REFINEMENT_SHAPE)
}

/// Rewrites the search for another pass, keeping only fully enriched games
pub struct RefineSearchStage {
    llm: Arc<dyn StructuredModel>,
}

impl RefineSearchStage {
    pub fn new(llm: Arc<dyn StructuredModel>) -> Self {
        Self { llm }
    }
}

#[async_trait::async_trait]
impl Stage for RefineSearchStage {
    fn name(&self) -> StageName {
        StageName::RefineSearch
    }

    fn consumes(&self) -> &'static [StateField] {
        &[
            StateField::RawSearchResults,
            StateField::GameNames,
            StateField::GameDescriptions,
            StateField::GamePrices,
        ]
    }

    async fn run(&self, state: &PipelineState) -> AppResult<StateUpdate> {
        let prompt = refinement_prompt(state);
        let refinement = match complete_json::<Refinement>(self.llm.as_ref(), &prompt).await {
            Ok(refinement) if !refinement.primary_search_query.trim().is_empty() => refinement,
            Ok(_) => {
                tracing::warn!("Refinement returned a blank query, using fallback policy");
                fallback_refinement(state)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Search refinement failed, using fallback policy");
                fallback_refinement(state)
            }
        };

        let retained: Vec<GameRecord> = state
            .games
            .iter()
            .filter(|game| game.is_complete())
            .cloned()
            .collect();

        let retry_count = state.retry_count + 1;
        tracing::info!(
            query = %refinement.primary_search_query,
            strategy = refinement.new_strategy.as_str(),
            alternatives = refinement.alternative_queries.len(),
            retained = retained.len(),
            dropped = state.games.len() - retained.len(),
            retry_count,
            reasoning = %refinement.reasoning,
            "Search refined"
        );

        Ok(StateUpdate {
            search_query: Some(refinement.primary_search_query.trim().to_string()),
            search_strategy: Some(refinement.new_strategy),
            alternative_search_queries: Some(refinement.alternative_queries),
            retry_count: Some(retry_count),
            games: Some(retained),
            ..Default::default()
        })
    }
}
