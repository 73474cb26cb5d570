mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use common::{farming_pipeline, pipeline, ScriptedModel, StubCatalog, StubPrices, StubSearch};
use game_recs_api::{
    pipeline::{PipelineMode, RecommendationPipeline},
    routes::create_router,
    services::llm::LlmTask,
    state::AppState,
};

fn create_test_server(pipeline: RecommendationPipeline) -> TestServer {
    let app = create_router(AppState::new(pipeline));
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(farming_pipeline(PipelineMode::Agentic));

    let response = server.get("/health").await;

    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_recommendations() {
    let server = create_test_server(farming_pipeline(PipelineMode::Agentic));

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "request": "relaxing farming game" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0]["game"]["name"], "Stardew Valley");
    assert_eq!(recommendations[0]["game"]["id"], "stardew-valley");
    assert_eq!(recommendations[0]["game"]["currentPrice"], 14.99);
    assert_eq!(recommendations[0]["game"]["discount"], 0);
    assert!(recommendations[0]["reasoning"].as_str().unwrap().len() > 10);
}

#[tokio::test]
async fn test_blank_request_is_bad_request() {
    let server = create_test_server(farming_pipeline(PipelineMode::Agentic));

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "request": "   " }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_unknown_game_id_is_unprocessable() {
    let model = ScriptedModel::farming().reply(
        LlmTask::Recommend,
        json!({ "recommendations": [{ "gameId": "ghost-game", "reasoning": "?" }] }),
    );
    let server = create_test_server(pipeline(
        Arc::new(model),
        Arc::new(StubSearch::farming()),
        StubCatalog::farming(),
        StubPrices::farming(),
        PipelineMode::Agentic,
    ));

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "request": "relaxing farming game" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("ghost-game"));
}

#[tokio::test]
async fn test_request_id_header() {
    let server = create_test_server(farming_pipeline(PipelineMode::Minimal));

    let response = server.get("/health").await;
    let generated = response.header("x-request-id");
    assert_eq!(generated.to_str().unwrap().len(), 36);

    let supplied = "6f1c1f9e-3a55-4c55-9d1e-2f3f4b9c8a10";
    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_static(supplied),
        )
        .await;
    assert_eq!(response.header("x-request-id"), supplied);
}
