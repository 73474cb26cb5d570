//! # Recommendation Orchestrator
//!
//! Drives one request through the stage graph:
//! 1. Complexity assessment (agentic only)
//! 2. Query analysis
//! 3. Search, then game-name extraction
//! 4. Description and price enrichment, concurrently
//! 5. Combination into the accumulated game set
//! 6. Quality assessment, looping back through refinement when needed (agentic only)
//! 7. Recommendation synthesis
//!
//! The orchestrator owns the [`PipelineState`]. Stages only see it immutably and hand back
//! updates; the [router](crate::pipeline::router) picks the next step.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::GameRecommendation,
    pipeline::{
        batch::BatchSettings,
        router::{self, Transition},
        stages::{
            AnalyzeQueryStage, AssessComplexityStage, AssessQualityStage, CombineStage,
            DescribeGamesStage, ExtractGamesStage, FetchPricesStage, PipelineTools,
            RecommendStage, RefineSearchStage, SearchStage, Stage, StageName,
        },
        state::{PipelineState, StateUpdate},
    },
};

/// Which stage graph to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Complexity assessment, quality assessment and the refinement loop
    #[default]
    Agentic,
    /// Straight line from query analysis to recommendations
    Minimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub mode: PipelineMode,
    pub batch: BatchSettings,
    pub search_result_limit: usize,
    pub min_relevance_score: f32,
    pub max_recommendations: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            mode: PipelineMode::default(),
            batch: BatchSettings::default(),
            search_result_limit: 5,
            min_relevance_score: 0.4,
            max_recommendations: 6,
        }
    }
}

pub struct RecommendationPipeline {
    stages: HashMap<StageName, Arc<dyn Stage>>,
    mode: PipelineMode,
}

impl RecommendationPipeline {
    /// Builds the standard stage table around the given tools
    pub fn new(tools: PipelineTools, settings: &PipelineSettings) -> Self {
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(AssessComplexityStage::new(tools.llm.clone())),
            Arc::new(AnalyzeQueryStage::new(tools.llm.clone())),
            Arc::new(SearchStage::new(
                tools.search.clone(),
                settings.search_result_limit,
                settings.min_relevance_score,
            )),
            Arc::new(ExtractGamesStage::new(tools.llm.clone())),
            Arc::new(DescribeGamesStage::new(tools.describe.clone(), settings.batch)),
            Arc::new(FetchPricesStage::new(tools.price.clone(), settings.batch)),
            Arc::new(CombineStage),
            Arc::new(AssessQualityStage::new(tools.llm.clone())),
            Arc::new(RefineSearchStage::new(tools.llm.clone())),
            Arc::new(RecommendStage::new(tools.llm, settings.max_recommendations)),
        ];

        Self::from_stages(stages, settings.mode)
    }

    /// Builds a pipeline from an explicit stage list; later entries replace earlier ones
    pub fn from_stages(stages: impl IntoIterator<Item = Arc<dyn Stage>>, mode: PipelineMode) -> Self {
        let stages = stages
            .into_iter()
            .map(|stage| (stage.name(), stage))
            .collect();
        Self { stages, mode }
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    /// Runs the pipeline and returns its recommendations
    pub async fn run(&self, user_request: &str) -> AppResult<Vec<GameRecommendation>> {
        let state = self.run_to_end(user_request).await?;
        Ok(state.game_recommendations.unwrap_or_default())
    }

    /// Runs the pipeline and returns the terminal state
    #[tracing::instrument(skip(self), fields(mode = ?self.mode))]
    pub async fn run_to_end(&self, user_request: &str) -> AppResult<PipelineState> {
        let user_request = user_request.trim();
        if user_request.is_empty() {
            return Err(AppError::InvalidInput("Request cannot be empty".to_string()));
        }

        let started = Instant::now();
        let mut state = PipelineState::new(user_request);
        let mut current = router::entry(self.mode);

        loop {
            self.execute(current, &mut state).await?;

            match router::next(self.mode, current, &state) {
                Transition::Goto(next) => current = next,
                Transition::Fork { branches, join } => {
                    self.execute_fork(&branches, &mut state).await?;
                    current = join;
                }
                Transition::End => break,
            }
        }

        tracing::info!(
            recommendations = state.game_recommendations.as_ref().map_or(0, Vec::len),
            refinement_passes = state.retry_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pipeline finished"
        );

        Ok(state)
    }

    fn stage(&self, name: StageName) -> AppResult<Arc<dyn Stage>> {
        self.stages
            .get(&name)
            .cloned()
            .ok_or_else(|| AppError::Pipeline(format!("no stage registered for {}", name)))
    }

    async fn execute(&self, name: StageName, state: &mut PipelineState) -> AppResult<()> {
        let stage = self.stage(name)?;
        check_requirements(stage.as_ref(), state)?;

        tracing::info!(stage = %name, retry_count = state.retry_count, "Running stage");
        let started = Instant::now();

        let update = stage.run(state).await.map_err(|e| {
            tracing::error!(stage = %name, error = %e, "Stage failed");
            e
        })?;
        commit(stage.as_ref(), update, state);

        tracing::debug!(
            stage = %name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Stage finished"
        );
        Ok(())
    }

    /// Runs `branches` concurrently against the same state, then applies their updates in order
    async fn execute_fork(&self, branches: &[StageName], state: &mut PipelineState) -> AppResult<()> {
        let stages = branches
            .iter()
            .map(|name| self.stage(*name))
            .collect::<AppResult<Vec<_>>>()?;

        for stage in &stages {
            check_requirements(stage.as_ref(), state)?;
        }

        tracing::info!(
            stages = ?branches,
            retry_count = state.retry_count,
            "Running stages concurrently"
        );

        let snapshot: &PipelineState = state;
        let results = join_all(stages.iter().map(|stage| stage.run(snapshot))).await;

        for (stage, result) in stages.iter().zip(results) {
            let update = result.map_err(|e| {
                tracing::error!(stage = %stage.name(), error = %e, "Stage failed");
                e
            })?;
            commit(stage.as_ref(), update, state);
        }
        Ok(())
    }
}

fn check_requirements(stage: &dyn Stage, state: &PipelineState) -> AppResult<()> {
    match stage.requires().iter().find(|field| !state.has(**field)) {
        Some(missing) => Err(AppError::Pipeline(format!(
            "stage {} requires {} but it is not set",
            stage.name(),
            missing
        ))),
        None => Ok(()),
    }
}

fn commit(stage: &dyn Stage, update: StateUpdate, state: &mut PipelineState) {
    state.apply(update);
    for field in stage.consumes() {
        state.clear(*field);
    }
}
