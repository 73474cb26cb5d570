use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{error::AppResult, models::GameRecommendation, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    /// Free-text description of what the user wants to play
    pub request: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<GameRecommendation>,
}

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let recommendations = state.pipeline.run(&request.request).await?;
    Ok(Json(RecommendationResponse { recommendations }))
}
