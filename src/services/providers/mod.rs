/// Enrichment tool abstraction
///
/// The pipeline treats web search, catalog metadata and pricing as black boxes behind these
/// traits. Implementations are stateless apart from their HTTP client and optional cache, so a
/// single `Arc<dyn …>` is shared across stages and runs.
use crate::{
    error::AppResult,
    models::{GameDescription, PriceSnapshot, SearchHit},
};

pub mod itad;
pub mod rawg;
pub mod tavily;

pub use itad::ItadPriceTool;
pub use rawg::RawgDescriptionTool;
pub use tavily::TavilySearchTool;

/// Web search returning ranked snippets
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchTool: Send + Sync {
    /// Returns snippets ordered by descending relevance
    async fn search(&self, query: &str) -> AppResult<Vec<SearchHit>>;

    /// Tool name for logging
    fn name(&self) -> &'static str;
}

/// Catalog lookup returning canonical metadata for a game name
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DescriptionTool: Send + Sync {
    async fn describe(&self, name: &str) -> AppResult<GameDescription>;

    fn name(&self) -> &'static str;
}

/// Store lookup returning the current pricing for a game name
///
/// Implementations return `AppError::NotFound` when the game or its price is unknown.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PriceTool: Send + Sync {
    async fn price(&self, name: &str) -> AppResult<PriceSnapshot>;

    fn name(&self) -> &'static str;
}
