/// Tavily web search provider
///
/// Tavily returns a relevance score with every result, which the search stage filters on.
use crate::{
    error::{AppError, AppResult},
    models::SearchHit,
    services::providers::SearchTool,
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

const MAX_RESULTS: usize = 5;

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f32,
}

impl From<TavilyResult> for SearchHit {
    fn from(result: TavilyResult) -> Self {
        let content = if result.title.is_empty() {
            result.content
        } else {
            format!("{}\n{}", result.title, result.content)
        };
        SearchHit {
            content,
            score: result.score,
        }
    }
}

#[derive(Clone)]
pub struct TavilySearchTool {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TavilySearchTool {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }
}

#[async_trait::async_trait]
impl SearchTool for TavilySearchTool {
    async fn search(&self, query: &str) -> AppResult<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let response = self
            .http_client
            .post(format!("{}/search", self.api_url))
            .json(&TavilyRequest {
                api_key: &self.api_key,
                query,
                max_results: MAX_RESULTS,
                search_depth: "basic",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Tavily API returned status {}: {}",
                status, body
            )));
        }

        let body: TavilyResponse = response.json().await?;
        let mut hits: Vec<SearchHit> = body.results.into_iter().map(SearchHit::from).collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        tracing::info!(
            query = %query,
            results = hits.len(),
            provider = "tavily",
            "Web search completed"
        );

        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "tavily"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_to_hits() {
        let body: TavilyResponse = serde_json::from_str(
            r#"{
                "query": "cozy farming games",
                "results": [
                    {"title": "Best farming sims", "url": "https://example.com", "content": "Stardew Valley tops the list", "score": 0.91},
                    {"url": "https://example.org", "content": "Harvest Moon retrospective", "score": 0.38}
                ]
            }"#,
        )
        .unwrap();

        let hits: Vec<SearchHit> = body.results.into_iter().map(SearchHit::from).collect();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "Best farming sims\nStardew Valley tops the list");
        assert_eq!(hits[1].content, "Harvest Moon retrospective");
        assert!((hits[1].score - 0.38).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_response() {
        let body: TavilyResponse = serde_json::from_str(r#"{"query": "x"}"#).unwrap();
        assert!(body.results.is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let tool = TavilySearchTool::new("key".to_string(), "http://127.0.0.1:9".to_string());
        let result = tool.search("   ").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
