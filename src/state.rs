use std::sync::Arc;

use crate::pipeline::RecommendationPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RecommendationPipeline>,
}

impl AppState {
    pub fn new(pipeline: RecommendationPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}
