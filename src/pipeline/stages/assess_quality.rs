use std::sync::Arc;

use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{QualityAssessment, SearchQuality},
    pipeline::{
        quality::{data_counts, derive_flags, fallback_assessment},
        stages::{Stage, StageName},
        state::{PipelineState, StateUpdate},
    },
    services::llm::{complete_json, FieldSpec, JsonShape, LlmTask, Prompt, StructuredModel},
};

const QUALITY_SHAPE: JsonShape = JsonShape {
    fields: &[
        FieldSpec::new(
            "searchResultsQuality",
            "one of \"excellent\", \"good\", \"poor\", \"insufficient\"",
        ),
        FieldSpec::new("gameDataCompleteness", "number between 0.0 and 1.0"),
        FieldSpec::new("recommendationConfidence", "number between 0.0 and 1.0"),
        FieldSpec::new("needsRefinement", "boolean"),
        FieldSpec::new("issues", "array of string"),
    ],
};

/// Model verdict; absent fields take neutral defaults
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QualityVerdict {
    search_results_quality: Option<SearchQuality>,
    game_data_completeness: Option<f64>,
    recommendation_confidence: Option<f64>,
    #[serde(default)]
    needs_refinement: bool,
    #[serde(default)]
    issues: Vec<String>,
}

impl From<QualityVerdict> for QualityAssessment {
    fn from(verdict: QualityVerdict) -> Self {
        Self {
            search_results_quality: verdict
                .search_results_quality
                .unwrap_or(SearchQuality::Poor),
            game_data_completeness: verdict.game_data_completeness.unwrap_or(0.5).clamp(0.0, 1.0),
            recommendation_confidence: verdict
                .recommendation_confidence
                .unwrap_or(0.5)
                .clamp(0.0, 1.0),
            needs_refinement: verdict.needs_refinement,
            issues: verdict.issues,
        }
    }
}

fn quality_prompt(state: &PipelineState) -> Prompt {
    let (descriptions, prices) = data_counts(&state.games);
    let text = format!(
        "You are an expert at evaluating the quality of game search results and data completeness.

Evaluate the following data for a game recommendation request:

Original User Request: {request}
Search Query Used: {query}
Number of Games Extracted: {games}
Number of Games with Descriptions: {descriptions}
Number of Games with Price Info: {prices}

Quality Guidelines:
- Excellent: 9+ relevant games, complete data, perfect match to request
- Good: 6-8 relevant games, mostly complete data, good match
- Poor: 3-5 games, incomplete data, partial match
- Insufficient: fewer than 3 games or very poor relevance

Data Completeness: ratio of complete game records (with descriptions and prices)
Recommendation Confidence: how confident you are that these results will satisfy the user",
        request = state.user_request,
        query = state.search_query.as_deref().unwrap_or("No search query"),
        games = state.games.len(),
        descriptions = descriptions,
        prices = prices,
    );
    Prompt::json(LlmTask::AssessResults, text, &QUALITY_SHAPE)
}

/// Grades the accumulated games and sets the refinement flags
pub struct AssessQualityStage {
    llm: Arc<dyn StructuredModel>,
}

impl AssessQualityStage {
    pub fn new(llm: Arc<dyn StructuredModel>) -> Self {
        Self { llm }
    }
}

#[async_trait::async_trait]
impl Stage for AssessQualityStage {
    fn name(&self) -> StageName {
        StageName::AssessQuality
    }

    async fn run(&self, state: &PipelineState) -> AppResult<StateUpdate> {
        let prompt = quality_prompt(state);
        let assessment = match complete_json::<QualityVerdict>(self.llm.as_ref(), &prompt).await {
            Ok(verdict) => QualityAssessment::from(verdict),
            Err(e) => {
                tracing::warn!(error = %e, "Quality assessment failed, using heuristic");
                fallback_assessment(&state.games)
            }
        };

        let flags = derive_flags(&assessment, state.decision_flags, state.retry_count);

        tracing::info!(
            quality = ?assessment.search_results_quality,
            completeness = assessment.game_data_completeness,
            confidence = assessment.recommendation_confidence,
            needs_refinement = assessment.needs_refinement,
            retry_count = state.retry_count,
            "Result quality assessed"
        );

        Ok(StateUpdate {
            quality_assessment: Some(assessment),
            decision_flags: Some(flags),
            ..Default::default()
        })
    }
}
