use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::PriceRecord,
    pipeline::{
        batch::{run_batched, BatchSettings},
        stages::{Stage, StageName},
        state::{PipelineState, StateField, StateUpdate},
    },
    services::providers::PriceTool,
};

/// Looks up current store pricing for every candidate name
pub struct FetchPricesStage {
    price: Arc<dyn PriceTool>,
    batch: BatchSettings,
}

impl FetchPricesStage {
    pub fn new(price: Arc<dyn PriceTool>, batch: BatchSettings) -> Self {
        Self { price, batch }
    }
}

#[async_trait::async_trait]
impl Stage for FetchPricesStage {
    fn name(&self) -> StageName {
        StageName::FetchPrices
    }

    fn requires(&self) -> &'static [StateField] {
        &[StateField::GameNames]
    }

    async fn run(&self, state: &PipelineState) -> AppResult<StateUpdate> {
        let names = state.game_names.clone().unwrap_or_default();
        let tool = self.price.as_ref();

        let records = run_batched(
            names,
            &self.batch,
            |name: String| async move {
                let snapshot = tool.price(&name).await?;
                Ok::<_, AppError>(PriceRecord::from_snapshot(&name, &snapshot))
            },
            |name, error| {
                tracing::warn!(
                    game = %name,
                    error = %error,
                    provider = tool.name(),
                    "Price lookup failed, leaving price empty"
                );
                PriceRecord::degraded(name)
            },
        )
        .await;

        let priced = records.iter().filter(|r| r.current_price.is_some()).count();
        tracing::info!(requested = records.len(), priced, "Game prices fetched");

        Ok(StateUpdate {
            game_prices: Some(records),
            ..Default::default()
        })
    }
}
