use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use game_recs_api::{
    cache::{create_redis_client, Cache},
    config::Config,
    pipeline::{PipelineTools, RecommendationPipeline},
    routes::create_router,
    services::{
        llm::OpenRouterModel,
        providers::{ItadPriceTool, RawgDescriptionTool, TavilySearchTool},
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "game_recs_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let (cache, cache_writer) = match config.redis_url.as_deref() {
        Some(url) => {
            let client = create_redis_client(url).context("Failed to create Redis client")?;
            let (cache, writer) = Cache::new(client)
                .await
                .context("Failed to connect to Redis")?;
            tracing::info!("Lookup cache enabled");
            (Some(cache), Some(writer))
        }
        None => {
            tracing::info!("REDIS_URL not set, lookups run uncached");
            (None, None)
        }
    };

    let llm = OpenRouterModel::new(
        config.openrouter_api_key.clone(),
        config.openrouter_api_url.clone(),
        config.openrouter_referer.clone(),
        config.openrouter_title.clone(),
        config.model_selection(),
        config.model_temperature,
        config.max_output_tokens,
    );

    let tools = PipelineTools {
        llm: Arc::new(llm),
        search: Arc::new(TavilySearchTool::new(
            config.tavily_api_key.clone(),
            config.tavily_api_url.clone(),
        )),
        describe: Arc::new(RawgDescriptionTool::new(
            config.rawg_api_key.clone(),
            config.rawg_api_url.clone(),
            cache.clone(),
        )),
        price: Arc::new(ItadPriceTool::new(
            config.itad_api_key.clone(),
            config.itad_api_url.clone(),
            config.price_country.clone(),
            cache,
        )),
    };

    let settings = config.pipeline_settings();
    let pipeline = RecommendationPipeline::new(tools, &settings);
    tracing::info!(mode = ?settings.mode, model = %config.llm_model, "Pipeline ready");

    let app = create_router(AppState::new(pipeline));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
