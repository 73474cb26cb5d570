/// RAWG catalog provider
///
/// API Flow:
/// 1. Search: /games?search=…&search_precise=true → candidate list
/// 2. Details: /games/{id} → description, genres, tags, platforms
///
/// The best candidate is an exact (case-insensitive) name match, then a prefix match, then
/// RAWG's own top result.
use crate::{
    cache::{Cache, CacheKey},
    cached,
    error::{AppError, AppResult},
    models::GameDescription,
    services::providers::DescriptionTool,
};
use regex::Regex;
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize};
use std::sync::LazyLock;

const DESCRIPTION_CACHE_TTL: u64 = 604800; // 1 week
const SEARCH_PAGE_SIZE: &str = "5";

// A bare `<` never opens a tag, so its text survives
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<>]*>").expect("tag pattern is valid"));

#[derive(Debug, Deserialize)]
struct RawgSearchResponse {
    #[serde(default)]
    results: Vec<RawgGame>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawgGame {
    id: u64,
    #[serde(default)]
    name: String,
    playtime: Option<u32>,
    background_image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawgNamed {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawgPlatformEntry {
    platform: RawgNamed,
}

#[derive(Debug, Deserialize)]
struct RawgGameDetails {
    #[serde(default)]
    name: String,
    description: Option<String>,
    playtime: Option<u32>,
    background_image: Option<String>,
    #[serde(default)]
    genres: Vec<RawgNamed>,
    #[serde(default)]
    tags: Vec<RawgNamed>,
    #[serde(default)]
    platforms: Option<Vec<RawgPlatformEntry>>,
}

#[derive(Clone)]
pub struct RawgDescriptionTool {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Option<Cache>,
}

impl RawgDescriptionTool {
    pub fn new(api_key: String, api_url: String, cache: Option<Cache>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            cache,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<T> {
        let response = self
            .http_client
            .get(format!("{}{}", self.api_url, path))
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "RAWG API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    async fn lookup(&self, name: &str) -> AppResult<GameDescription> {
        let search: RawgSearchResponse = self
            .get_json(
                "/games",
                &[
                    ("search", name),
                    ("search_precise", "true"),
                    ("page_size", SEARCH_PAGE_SIZE),
                ],
            )
            .await?;

        let best = find_best_match(&search.results, name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No catalog entry for {}", name)))?;

        let details: RawgGameDetails = self.get_json(&format!("/games/{}", best.id), &[]).await?;

        let description = into_description(details, &best, name);

        tracing::info!(
            query = %name,
            matched = %description.name,
            provider = "rawg",
            "Game description fetched"
        );

        Ok(description)
    }
}

fn find_best_match<'a>(results: &'a [RawgGame], name: &str) -> Option<&'a RawgGame> {
    let wanted = name.to_lowercase();

    results
        .iter()
        .find(|game| game.name.to_lowercase() == wanted)
        .or_else(|| {
            results
                .iter()
                .find(|game| game.name.to_lowercase().starts_with(&wanted))
        })
        .or_else(|| results.first())
}

fn into_description(details: RawgGameDetails, best: &RawgGame, query: &str) -> GameDescription {
    let genre = details
        .genres
        .first()
        .map(|g| g.name.clone())
        .or_else(|| {
            details
                .platforms
                .as_ref()
                .and_then(|platforms| platforms.first())
                .map(|entry| entry.platform.name.clone())
        })
        .filter(|genre| !genre.is_empty());

    let tags: Vec<String> = details
        .tags
        .into_iter()
        .map(|tag| tag.name)
        .filter(|tag| !tag.is_empty())
        .collect();

    let description = details
        .description
        .map(|html| strip_html(&html))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "No description available.".to_string());

    let name = [details.name.as_str(), best.name.as_str(), query]
        .into_iter()
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(query)
        .to_string();

    GameDescription {
        name,
        description,
        genre,
        playtime: details
            .playtime
            .or(best.playtime)
            .filter(|hours| *hours > 0)
            .map(|hours| format!("{} hours", hours)),
        tags: Some(tags),
        image_url: details.background_image.or_else(|| best.background_image.clone()),
    }
}

/// Removes markup tags and trims the result
fn strip_html(html: &str) -> String {
    HTML_TAG.replace_all(html, "").trim().to_string()
}

#[async_trait::async_trait]
impl DescriptionTool for RawgDescriptionTool {
    async fn describe(&self, name: &str) -> AppResult<GameDescription> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("Game name cannot be empty".to_string()));
        }

        cached!(
            self.cache,
            CacheKey::Description(name.to_string()),
            DESCRIPTION_CACHE_TTL,
            async move { self.lookup(name).await }
        )
    }

    fn name(&self) -> &'static str {
        "rawg"
    }
}
