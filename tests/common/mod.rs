#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};

use game_recs_api::{
    error::{AppError, AppResult},
    models::{GameDescription, PriceSnapshot, SearchHit},
    pipeline::{BatchSettings, PipelineMode, PipelineSettings, PipelineTools, RecommendationPipeline},
    services::{
        llm::{LlmError, LlmTask, ModelOutput, Prompt, StructuredModel},
        providers::{DescriptionTool, PriceTool, SearchTool},
    },
};

/// Answers each task with a canned reply; tasks can be switched to failures
pub struct ScriptedModel {
    replies: HashMap<LlmTask, Result<ModelOutput, String>>,
    calls: Mutex<Vec<LlmTask>>,
}

impl ScriptedModel {
    /// A happy-path script for a "relaxing farming game" request
    pub fn farming() -> Self {
        let mut replies = HashMap::new();
        replies.insert(
            LlmTask::AssessComplexity,
            Ok(ModelOutput::Json(json!({
                "isComplexQuery": false,
                "requiresSpecializedSearch": false,
                "searchStrategy": "standard",
                "reasoning": "Simple genre request"
            }))),
        );
        replies.insert(
            LlmTask::AnalyzeQuery,
            Ok(ModelOutput::Text("relaxing farming games".to_string())),
        );
        replies.insert(
            LlmTask::ExtractGames,
            Ok(ModelOutput::Json(json!({ "gameNames": ["Stardew Valley"] }))),
        );
        replies.insert(
            LlmTask::AssessResults,
            Ok(ModelOutput::Json(json!({
                "searchResultsQuality": "good",
                "gameDataCompleteness": 1.0,
                "recommendationConfidence": 0.9,
                "needsRefinement": false,
                "issues": []
            }))),
        );
        replies.insert(
            LlmTask::RefineSearch,
            Err("refinement not scripted".to_string()),
        );
        replies.insert(
            LlmTask::Recommend,
            Ok(ModelOutput::Json(json!({
                "recommendations": [{
                    "gameId": "stardew-valley",
                    "reasoning": "A calm farming sim with endless charm. At its regular price it is an easy pick."
                }]
            }))),
        );

        Self {
            replies,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, task: LlmTask, output: Value) -> Self {
        self.replies.insert(task, Ok(ModelOutput::Json(output)));
        self
    }

    pub fn fail(mut self, task: LlmTask) -> Self {
        self.replies
            .insert(task, Err(format!("{} unavailable", task)));
        self
    }

    pub fn calls(&self, task: LlmTask) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|t| **t == task)
            .count()
    }
}

#[async_trait::async_trait]
impl StructuredModel for ScriptedModel {
    async fn complete(&self, prompt: &Prompt) -> Result<ModelOutput, LlmError> {
        self.calls.lock().unwrap().push(prompt.task);
        match self.replies.get(&prompt.task) {
            Some(Ok(output)) => Ok(output.clone()),
            Some(Err(message)) => Err(LlmError::Response(message.clone())),
            None => Err(LlmError::EmptyResponse),
        }
    }
}

/// Returns the same hits for every query and records the queries it saw
pub struct StubSearch {
    hits: Vec<SearchHit>,
    queries: Mutex<Vec<String>>,
}

impl StubSearch {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn farming() -> Self {
        Self::new(vec![
            SearchHit {
                content: "Stardew Valley is the best relaxing farming game".to_string(),
                score: 0.92,
            },
            SearchHit {
                content: "Unrelated forum post".to_string(),
                score: 0.12,
            },
        ])
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SearchTool for StubSearch {
    async fn search(&self, query: &str) -> AppResult<Vec<SearchHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.hits.clone())
    }

    fn name(&self) -> &'static str {
        "stub-search"
    }
}

/// Catalog keyed by requested name; unknown names fail
#[derive(Default)]
pub struct StubCatalog {
    entries: HashMap<String, GameDescription>,
}

impl StubCatalog {
    pub fn farming() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            "Stardew Valley".to_string(),
            GameDescription {
                name: "Stardew Valley".to_string(),
                description: "Inherit your grandfather's old farm and build a new life."
                    .to_string(),
                genre: Some("Simulation".to_string()),
                playtime: Some("52 hours".to_string()),
                tags: Some(vec!["Farming".to_string(), "Relaxing".to_string()]),
                image_url: None,
            },
        );
        Self { entries }
    }
}

#[async_trait::async_trait]
impl DescriptionTool for StubCatalog {
    async fn describe(&self, name: &str) -> AppResult<GameDescription> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No catalog entry for {}", name)))
    }

    fn name(&self) -> &'static str {
        "stub-catalog"
    }
}

/// Store prices keyed by requested name; unknown names fail
#[derive(Default)]
pub struct StubPrices {
    entries: HashMap<String, (f64, f64)>,
}

impl StubPrices {
    pub fn farming() -> Self {
        let mut entries = HashMap::new();
        entries.insert("Stardew Valley".to_string(), (14.99, 14.99));
        Self { entries }
    }
}

#[async_trait::async_trait]
impl PriceTool for StubPrices {
    async fn price(&self, name: &str) -> AppResult<PriceSnapshot> {
        let (current, regular) = self
            .entries
            .get(name)
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("No price for {}", name)))?;

        Ok(PriceSnapshot {
            current_price: current,
            regular_price: regular,
            url: format!("https://isthereanydeal.com/game/{}/", name.to_lowercase()),
        })
    }

    fn name(&self) -> &'static str {
        "stub-prices"
    }
}

pub fn settings(mode: PipelineMode) -> PipelineSettings {
    PipelineSettings {
        mode,
        batch: BatchSettings {
            concurrency: 3,
            delay: Duration::ZERO,
        },
        ..Default::default()
    }
}

pub fn pipeline(
    model: Arc<ScriptedModel>,
    search: Arc<StubSearch>,
    catalog: StubCatalog,
    prices: StubPrices,
    mode: PipelineMode,
) -> RecommendationPipeline {
    let tools = PipelineTools {
        llm: model,
        search,
        describe: Arc::new(catalog),
        price: Arc::new(prices),
    };
    RecommendationPipeline::new(tools, &settings(mode))
}

/// Pipeline wired with the farming fixtures
pub fn farming_pipeline(mode: PipelineMode) -> RecommendationPipeline {
    pipeline(
        Arc::new(ScriptedModel::farming()),
        Arc::new(StubSearch::farming()),
        StubCatalog::farming(),
        StubPrices::farming(),
        mode,
    )
}
