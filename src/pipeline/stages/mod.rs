//! Pipeline stages
//!
//! Each stage reads the shared [`PipelineState`] and returns a [`StateUpdate`]. Stages never
//! mutate state directly: the orchestrator checks [`Stage::requires`] before running a stage,
//! applies its update afterwards, then clears the fields listed in [`Stage::consumes`].
use std::fmt::{self, Display};
use std::sync::Arc;

use crate::{
    error::AppResult,
    pipeline::state::{PipelineState, StateField, StateUpdate},
    services::{
        llm::StructuredModel,
        providers::{DescriptionTool, PriceTool, SearchTool},
    },
};

mod analyze_query;
mod assess_complexity;
mod assess_quality;
mod combine;
mod describe_games;
mod extract_games;
mod fetch_prices;
mod recommend;
mod refine_search;
mod search;

pub use analyze_query::AnalyzeQueryStage;
pub use assess_complexity::AssessComplexityStage;
pub use assess_quality::AssessQualityStage;
pub use combine::CombineStage;
pub use describe_games::DescribeGamesStage;
pub use extract_games::ExtractGamesStage;
pub use fetch_prices::FetchPricesStage;
pub use recommend::RecommendStage;
pub use refine_search::RefineSearchStage;
pub use search::SearchStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageName {
    AssessComplexity,
    AnalyzeQuery,
    Search,
    ExtractGames,
    DescribeGames,
    FetchPrices,
    Combine,
    AssessQuality,
    RefineSearch,
    Recommend,
}

impl Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageName::AssessComplexity => "assess_complexity",
            StageName::AnalyzeQuery => "analyze_query",
            StageName::Search => "search",
            StageName::ExtractGames => "extract_games",
            StageName::DescribeGames => "describe_games",
            StageName::FetchPrices => "fetch_prices",
            StageName::Combine => "combine",
            StageName::AssessQuality => "assess_quality",
            StageName::RefineSearch => "refine_search",
            StageName::Recommend => "recommend",
        };
        write!(f, "{}", name)
    }
}

/// One transformation step of the pipeline
#[async_trait::async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    /// Fields that must be present before the stage runs
    fn requires(&self) -> &'static [StateField] {
        &[]
    }

    /// Fields cleared once the stage's update has been applied
    fn consumes(&self) -> &'static [StateField] {
        &[]
    }

    async fn run(&self, state: &PipelineState) -> AppResult<StateUpdate>;
}

/// Collaborators shared by every stage of a pipeline
#[derive(Clone)]
pub struct PipelineTools {
    pub llm: Arc<dyn StructuredModel>,
    pub search: Arc<dyn SearchTool>,
    pub describe: Arc<dyn DescriptionTool>,
    pub price: Arc<dyn PriceTool>,
}
