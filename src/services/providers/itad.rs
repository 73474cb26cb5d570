/// IsThereAnyDeal pricing provider
///
/// API Flow:
/// 1. Search: /games/search/v1?title=… → candidates, first entry of type "game" wins
/// 2. Overview: POST /games/overview/v2?country=… with [id] → current and regular price
use crate::{
    cache::{Cache, CacheKey},
    cached,
    error::{AppError, AppResult},
    models::PriceSnapshot,
    services::providers::PriceTool,
};
use reqwest::Client as HttpClient;
use serde::Deserialize;

const PRICE_CACHE_TTL: u64 = 21600; // 6 hours

#[derive(Debug, Deserialize)]
struct ItadSearchEntry {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItadOverviewResponse {
    #[serde(default)]
    prices: Vec<ItadPriceEntry>,
}

#[derive(Debug, Deserialize)]
struct ItadPriceEntry {
    current: Option<ItadDeal>,
    #[serde(default)]
    urls: ItadUrls,
}

#[derive(Debug, Deserialize)]
struct ItadDeal {
    price: ItadAmount,
    regular: Option<ItadAmount>,
}

#[derive(Debug, Deserialize)]
struct ItadAmount {
    amount: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ItadUrls {
    game: Option<String>,
}

#[derive(Clone)]
pub struct ItadPriceTool {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    country: String,
    cache: Option<Cache>,
}

impl ItadPriceTool {
    pub fn new(api_key: String, api_url: String, country: String, cache: Option<Cache>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            country,
            cache,
        }
    }

    async fn find_game_id(&self, name: &str) -> AppResult<String> {
        let response = self
            .http_client
            .get(format!("{}/games/search/v1", self.api_url))
            .query(&[("key", self.api_key.as_str()), ("title", name)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "ITAD search returned status {}: {}",
                status, body
            )));
        }

        let entries: Vec<ItadSearchEntry> = response.json().await?;
        let game = first_game(entries)
            .ok_or_else(|| AppError::NotFound(format!("No matching game found for {}", name)))?;

        tracing::debug!(query = %name, matched = %game.title, id = %game.id, "ITAD game resolved");
        Ok(game.id)
    }

    async fn fetch_overview(&self, game_id: &str) -> AppResult<ItadOverviewResponse> {
        let response = self
            .http_client
            .post(format!("{}/games/overview/v2", self.api_url))
            .query(&[
                ("key", self.api_key.as_str()),
                ("country", self.country.as_str()),
            ])
            .json(&[game_id])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "ITAD overview returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    async fn lookup(&self, name: &str) -> AppResult<PriceSnapshot> {
        let game_id = self.find_game_id(name).await?;
        let overview = self.fetch_overview(&game_id).await?;
        let snapshot = into_snapshot(overview)
            .ok_or_else(|| AppError::NotFound(format!("No price information found for {}", name)))?;

        tracing::info!(
            query = %name,
            current_price = snapshot.current_price,
            regular_price = snapshot.regular_price,
            provider = "itad",
            "Price fetched"
        );

        Ok(snapshot)
    }
}

fn first_game(entries: Vec<ItadSearchEntry>) -> Option<ItadSearchEntry> {
    entries
        .into_iter()
        .find(|entry| entry.kind.as_deref() == Some("game"))
}

fn into_snapshot(overview: ItadOverviewResponse) -> Option<PriceSnapshot> {
    let entry = overview.prices.into_iter().next()?;
    let current = entry.current?;
    let current_price = current.price.amount;

    Some(PriceSnapshot {
        current_price,
        regular_price: current
            .regular
            .map(|regular| regular.amount)
            .unwrap_or(current_price),
        url: entry.urls.game.unwrap_or_default(),
    })
}

#[async_trait::async_trait]
impl PriceTool for ItadPriceTool {
    async fn price(&self, name: &str) -> AppResult<PriceSnapshot> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("Game name cannot be empty".to_string()));
        }

        cached!(
            self.cache,
            CacheKey::Price(name.to_string()),
            PRICE_CACHE_TTL,
            async move { self.lookup(name).await }
        )
    }

    fn name(&self) -> &'static str {
        "itad"
    }
}
