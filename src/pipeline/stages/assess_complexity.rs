use std::sync::Arc;

use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{DecisionFlags, SearchStrategy},
    pipeline::{
        stages::{Stage, StageName},
        state::{PipelineState, StateUpdate},
    },
    services::llm::{complete_json, FieldSpec, JsonShape, LlmTask, Prompt, StructuredModel},
};

const COMPLEXITY_SHAPE: JsonShape = JsonShape {
    fields: &[
        FieldSpec::new("isComplexQuery", "boolean"),
        FieldSpec::new("requiresSpecializedSearch", "boolean"),
        FieldSpec::new("searchStrategy", "one of \"standard\", \"broad\", \"specific\""),
        FieldSpec::new("reasoning", "string"),
    ],
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComplexityVerdict {
    is_complex_query: bool,
    requires_specialized_search: bool,
    search_strategy: SearchStrategy,
    #[serde(default)]
    reasoning: String,
}

impl Default for ComplexityVerdict {
    fn default() -> Self {
        Self {
            is_complex_query: false,
            requires_specialized_search: false,
            search_strategy: SearchStrategy::Standard,
            reasoning: "Error in analysis, using standard approach".to_string(),
        }
    }
}

fn complexity_prompt(user_request: &str) -> Prompt {
    let text = format!(
        "You are an expert at analyzing game recommendation requests to determine their complexity and requirements.

Analyze the following user request and determine:
1. Is this a complex query requiring specialized handling?
2. Does it need broad search or specific search?
3. Are there multiple distinct preferences that might require different search strategies?
4. Does it mention specific games, genres, or very niche requirements?

User Request: {user_request}

Guidelines:
- Complex queries: multiple conflicting preferences, very specific requirements, or requests for games \"like X but different in Y way\"
- Specialized search: mentions specific franchises, indie games, retro games, or very niche genres
- Standard: simple genre requests or basic preferences
- Broad: vague requests like \"something fun\" or \"good games\"
- Specific: detailed requirements with clear criteria"
    );
    Prompt::json(LlmTask::AssessComplexity, text, &COMPLEXITY_SHAPE)
}

/// Classifies the request and resets the per-run counters
pub struct AssessComplexityStage {
    llm: Arc<dyn StructuredModel>,
}

impl AssessComplexityStage {
    pub fn new(llm: Arc<dyn StructuredModel>) -> Self {
        Self { llm }
    }
}

#[async_trait::async_trait]
impl Stage for AssessComplexityStage {
    fn name(&self) -> StageName {
        StageName::AssessComplexity
    }

    async fn run(&self, state: &PipelineState) -> AppResult<StateUpdate> {
        let prompt = complexity_prompt(&state.user_request);
        let verdict = match complete_json::<ComplexityVerdict>(self.llm.as_ref(), &prompt).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(error = %e, "Complexity assessment failed, using standard approach");
                ComplexityVerdict::default()
            }
        };

        tracing::info!(
            is_complex = verdict.is_complex_query,
            specialized = verdict.requires_specialized_search,
            strategy = verdict.search_strategy.as_str(),
            reasoning = %verdict.reasoning,
            "Query complexity assessed"
        );

        Ok(StateUpdate {
            decision_flags: Some(DecisionFlags {
                is_complex_query: verdict.is_complex_query,
                requires_specialized_search: verdict.requires_specialized_search,
                ..Default::default()
            }),
            search_strategy: Some(verdict.search_strategy),
            retry_count: Some(0),
            alternative_search_queries: Some(Vec::new()),
            ..Default::default()
        })
    }
}
