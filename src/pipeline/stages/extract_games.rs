use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;

use crate::{
    error::AppResult,
    pipeline::{
        derive_id,
        stages::{Stage, StageName},
        state::{PipelineState, StateField, StateUpdate},
    },
    services::llm::{complete_json, FieldSpec, JsonShape, LlmTask, Prompt, StructuredModel},
};

const NAMES_SHAPE: JsonShape = JsonShape {
    fields: &[FieldSpec::new("gameNames", "array of string")],
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractedNames {
    game_names: Vec<String>,
}

fn extraction_prompt(snippets: &[String]) -> Prompt {
    let text = format!(
        "You are an expert at analyzing gaming content and extracting game names.

Your task is to analyze the provided search results about video games and extract just the names of games that seem worth recommending.

Guidelines:
- Extract ALL game names mentioned in the search results that seem worth recommending
- Return only the game names, not descriptions or other details
- Focus on games that seem most relevant and well-reviewed based on the search results
- Return just the exact game titles

Search Results:
{}",
        snippets.join("\n---\n")
    );
    Prompt::json(LlmTask::ExtractGames, text, &NAMES_SHAPE)
}

/// Drops blank names and names whose id is already known, keeping first occurrences
fn dedupe_names(names: Vec<String>, known_ids: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashSet<String> = known_ids.into_iter().collect();

    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(derive_id(name)))
        .collect()
}

/// Pulls candidate game names out of raw search snippets
pub struct ExtractGamesStage {
    llm: Arc<dyn StructuredModel>,
}

impl ExtractGamesStage {
    pub fn new(llm: Arc<dyn StructuredModel>) -> Self {
        Self { llm }
    }
}

#[async_trait::async_trait]
impl Stage for ExtractGamesStage {
    fn name(&self) -> StageName {
        StageName::ExtractGames
    }

    fn requires(&self) -> &'static [StateField] {
        &[StateField::RawSearchResults]
    }

    fn consumes(&self) -> &'static [StateField] {
        &[StateField::RawSearchResults]
    }

    async fn run(&self, state: &PipelineState) -> AppResult<StateUpdate> {
        let snippets = state.raw_search_results.as_deref().unwrap_or_default();

        let extracted = if snippets.is_empty() {
            Vec::new()
        } else {
            let prompt = extraction_prompt(snippets);
            match complete_json::<ExtractedNames>(self.llm.as_ref(), &prompt).await {
                Ok(names) => names.game_names,
                Err(e) => {
                    tracing::warn!(error = %e, "Game name extraction failed, continuing with none");
                    Vec::new()
                }
            }
        };

        let extracted_count = extracted.len();
        let names = dedupe_names(extracted, state.games.iter().map(|g| g.id.clone()));

        tracing::info!(
            extracted = extracted_count,
            new_names = names.len(),
            known_games = state.games.len(),
            "Game names extracted"
        );

        Ok(StateUpdate {
            game_names: Some(names),
            ..Default::default()
        })
    }
}
