use std::time::Duration;

use serde::Deserialize;

use crate::pipeline::{BatchSettings, PipelineMode, PipelineSettings};
use crate::services::llm::ModelSelection;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// OpenRouter API key
    pub openrouter_api_key: String,

    /// OpenRouter API base URL
    #[serde(default = "default_openrouter_api_url")]
    pub openrouter_api_url: String,

    /// Value sent in the `HTTP-Referer` header
    #[serde(default = "default_openrouter_referer")]
    pub openrouter_referer: String,

    /// Value sent in the `X-Title` header
    #[serde(default = "default_openrouter_title")]
    pub openrouter_title: String,

    /// Model used for every LLM task without a dedicated override
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    pub analyze_query_model: Option<String>,
    pub assess_results_model: Option<String>,
    pub refine_search_model: Option<String>,

    #[serde(default = "default_model_temperature")]
    pub model_temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Tavily web search API key
    pub tavily_api_key: String,

    #[serde(default = "default_tavily_api_url")]
    pub tavily_api_url: String,

    /// RAWG catalog API key
    pub rawg_api_key: String,

    #[serde(default = "default_rawg_api_url")]
    pub rawg_api_url: String,

    /// IsThereAnyDeal API key
    pub itad_api_key: String,

    #[serde(default = "default_itad_api_url")]
    pub itad_api_url: String,

    /// ISO country code used for price lookups
    #[serde(default = "default_price_country")]
    pub price_country: String,

    /// Redis connection URL; lookups run uncached when unset
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub pipeline_mode: PipelineMode,

    /// Maximum number of concurrent enrichment lookups per batch
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// Pause between enrichment batches, in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    #[serde(default = "default_search_result_limit")]
    pub search_result_limit: usize,

    #[serde(default = "default_min_relevance_score")]
    pub min_relevance_score: f32,

    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

fn default_openrouter_api_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_openrouter_referer() -> String {
    "http://localhost:3000".to_string()
}

fn default_openrouter_title() -> String {
    "Game Recommender".to_string()
}

fn default_llm_model() -> String {
    "google/gemini-2.5-flash".to_string()
}

fn default_model_temperature() -> f32 {
    0.2
}

fn default_max_output_tokens() -> u32 {
    4096
}

fn default_tavily_api_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_rawg_api_url() -> String {
    "https://api.rawg.io/api".to_string()
}

fn default_itad_api_url() -> String {
    "https://api.isthereanydeal.com".to_string()
}

fn default_price_country() -> String {
    "US".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_batch_concurrency() -> usize {
    3
}

fn default_batch_delay_ms() -> u64 {
    100
}

fn default_search_result_limit() -> usize {
    5
}

fn default_min_relevance_score() -> f32 {
    0.4
}

fn default_max_recommendations() -> usize {
    6
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Tuning knobs for the recommendation pipeline
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            mode: self.pipeline_mode,
            batch: BatchSettings {
                concurrency: self.batch_concurrency,
                delay: Duration::from_millis(self.batch_delay_ms),
            },
            search_result_limit: self.search_result_limit,
            min_relevance_score: self.min_relevance_score,
            max_recommendations: self.max_recommendations,
        }
    }

    /// Per-task model names, resolved once at startup
    pub fn model_selection(&self) -> ModelSelection {
        ModelSelection {
            default_model: self.llm_model.clone(),
            analyze_query: self.analyze_query_model.clone(),
            assess_results: self.assess_results_model.clone(),
            refine_search: self.refine_search_model.clone(),
        }
    }
}
