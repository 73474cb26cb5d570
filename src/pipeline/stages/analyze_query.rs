use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::SearchStrategy,
    pipeline::{
        stages::{Stage, StageName},
        state::{PipelineState, StateUpdate},
    },
    services::llm::{complete_text, LlmError, LlmTask, Prompt, StructuredModel},
};

fn strategy_guidance(strategy: SearchStrategy) -> &'static str {
    match strategy {
        SearchStrategy::Standard => {
            "Write a concise keyword query of 3 to 6 words that captures the genre, mood and key mechanics."
        }
        SearchStrategy::Broad => {
            "Write a discovery-oriented query that uses synonyms and related genres so that lists and roundups of many games are found."
        }
        SearchStrategy::Specific => {
            "Write a precise query that uses technical or niche terms (subgenres, mechanics, eras, platforms) taken from the request."
        }
    }
}

fn analysis_prompt(state: &PipelineState) -> Prompt {
    let flags = &state.decision_flags;
    let mut notes = Vec::new();
    if flags.is_complex_query {
        notes.push("The request combines several preferences; keep the most important ones.");
    }
    if flags.requires_specialized_search {
        notes.push("The request targets a niche; keep franchise, era and subgenre names verbatim.");
    }
    let notes = if notes.is_empty() {
        String::new()
    } else {
        format!("\nNotes:\n- {}\n", notes.join("\n- "))
    };

    let text = format!(
        "You turn video game recommendation requests into a single web search query.

User Request: {request}
Search Strategy: {strategy}

{guidance}
{notes}
Rules:
- Return exactly one query on a single line
- Do not use boolean operators, quotes or multiple alternatives
- Do not add any explanation",
        request = state.user_request,
        strategy = state.search_strategy.as_str(),
        guidance = strategy_guidance(state.search_strategy),
        notes = notes,
    );
    Prompt::text(LlmTask::AnalyzeQuery, text)
}

/// First non-empty line of the answer with wrapping quotes removed
fn clean_query(answer: &str) -> Option<String> {
    answer
        .lines()
        .map(|line| line.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`').trim())
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Rewrites the request into a search query for the current strategy
pub struct AnalyzeQueryStage {
    llm: Arc<dyn StructuredModel>,
}

impl AnalyzeQueryStage {
    pub fn new(llm: Arc<dyn StructuredModel>) -> Self {
        Self { llm }
    }
}

#[async_trait::async_trait]
impl Stage for AnalyzeQueryStage {
    fn name(&self) -> StageName {
        StageName::AnalyzeQuery
    }

    async fn run(&self, state: &PipelineState) -> AppResult<StateUpdate> {
        let answer = complete_text(self.llm.as_ref(), &analysis_prompt(state)).await?;
        let query = clean_query(&answer).ok_or(AppError::Llm(LlmError::EmptyResponse))?;

        tracing::info!(
            query = %query,
            strategy = state.search_strategy.as_str(),
            "Search query generated"
        );

        Ok(StateUpdate {
            search_query: Some(query),
            ..Default::default()
        })
    }
}
