use std::collections::{HashMap, HashSet};

use crate::{
    error::AppResult,
    models::{GameRecord, PriceRecord},
    pipeline::{
        stages::{Stage, StageName},
        state::{PipelineState, StateField, StateUpdate},
    },
};

/// Joins description records with price records by id
///
/// A description without a matching price keeps empty price fields. Ids already present in
/// `existing` are skipped, as are repeated ids within `descriptions`.
pub fn combine_records(
    existing: &[GameRecord],
    descriptions: &[GameRecord],
    prices: &[PriceRecord],
) -> Vec<GameRecord> {
    let prices_by_id: HashMap<&str, &PriceRecord> =
        prices.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut seen: HashSet<&str> = existing.iter().map(|g| g.id.as_str()).collect();

    let mut merged = existing.to_vec();
    for description in descriptions {
        if !seen.insert(description.id.as_str()) {
            continue;
        }
        let price = prices_by_id.get(description.id.as_str()).copied();
        merged.push(description.clone().with_price(price));
    }
    merged
}

/// Merges the enrichment buffers into the accumulated game set
pub struct CombineStage;

#[async_trait::async_trait]
impl Stage for CombineStage {
    fn name(&self) -> StageName {
        StageName::Combine
    }

    fn requires(&self) -> &'static [StateField] {
        &[StateField::GameDescriptions, StateField::GamePrices]
    }

    fn consumes(&self) -> &'static [StateField] {
        &[
            StateField::GameNames,
            StateField::GameDescriptions,
            StateField::GamePrices,
        ]
    }

    async fn run(&self, state: &PipelineState) -> AppResult<StateUpdate> {
        let descriptions = state.game_descriptions.as_deref().unwrap_or_default();
        let prices = state.game_prices.as_deref().unwrap_or_default();

        let games = combine_records(&state.games, descriptions, prices);

        tracing::info!(
            previous = state.games.len(),
            added = games.len() - state.games.len(),
            total = games.len(),
            "Game data combined"
        );

        Ok(StateUpdate {
            games: Some(games),
            ..Default::default()
        })
    }
}
