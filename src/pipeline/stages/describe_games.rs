use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::GameRecord,
    pipeline::{
        batch::{run_batched, BatchSettings},
        stages::{Stage, StageName},
        state::{PipelineState, StateField, StateUpdate},
    },
    services::providers::DescriptionTool,
};

/// Looks up catalog metadata for every candidate name
pub struct DescribeGamesStage {
    describe: Arc<dyn DescriptionTool>,
    batch: BatchSettings,
}

impl DescribeGamesStage {
    pub fn new(describe: Arc<dyn DescriptionTool>, batch: BatchSettings) -> Self {
        Self { describe, batch }
    }
}

#[async_trait::async_trait]
impl Stage for DescribeGamesStage {
    fn name(&self) -> StageName {
        StageName::DescribeGames
    }

    fn requires(&self) -> &'static [StateField] {
        &[StateField::GameNames]
    }

    async fn run(&self, state: &PipelineState) -> AppResult<StateUpdate> {
        let names = state.game_names.clone().unwrap_or_default();
        let tool = self.describe.as_ref();

        let records = run_batched(
            names,
            &self.batch,
            |name: String| async move {
                let description = tool.describe(&name).await?;
                Ok::<_, AppError>(GameRecord::from_description(&name, description))
            },
            |name, error| {
                tracing::warn!(
                    game = %name,
                    error = %error,
                    provider = tool.name(),
                    "Description lookup failed, using placeholder"
                );
                GameRecord::degraded(name)
            },
        )
        .await;

        tracing::info!(described = records.len(), "Game descriptions fetched");

        Ok(StateUpdate {
            game_descriptions: Some(records),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameDescription;
    use crate::services::providers::MockDescriptionTool;
    use std::time::Duration;

    fn batch() -> BatchSettings {
        BatchSettings {
            concurrency: 3,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_every_name_yields_one_record() {
        let mut tool = MockDescriptionTool::new();
        tool.expect_describe().returning(|name| {
            if name == "Missing Game" {
                Err(AppError::NotFound(name.to_string()))
            } else {
                Ok(GameDescription {
                    name: format!("{} (Canonical)", name),
                    description: "A game.".to_string(),
                    genre: Some("Simulation".to_string()),
                    playtime: None,
                    tags: None,
                    image_url: None,
                })
            }
        });
        tool.expect_name().return_const("mock");

        let mut state = PipelineState::new("farming");
        state.game_names = Some(vec![
            "Stardew Valley".to_string(),
            "Missing Game".to_string(),
            "Coral Island".to_string(),
            "Sun Haven".to_string(),
        ]);

        let stage = DescribeGamesStage::new(Arc::new(tool), batch());
        let mut records = stage.run(&state).await.unwrap().game_descriptions.unwrap();
        records.sort_by(|a, b| a.id.cmp(&b.id));

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["coral-island", "missing-game", "stardew-valley", "sun-haven"]);

        let missing = &records[1];
        assert_eq!(missing.name, "Missing Game");
        assert_eq!(missing.description, "Missing Game is a video game.");
        assert!(missing.genre.is_none());

        assert_eq!(records[2].name, "Stardew Valley (Canonical)");
    }

    #[tokio::test]
    async fn test_empty_names() {
        let mut tool = MockDescriptionTool::new();
        tool.expect_describe().never();

        let mut state = PipelineState::new("farming");
        state.game_names = Some(Vec::new());

        let stage = DescribeGamesStage::new(Arc::new(tool), batch());
        let update = stage.run(&state).await.unwrap();
        assert_eq!(update.game_descriptions, Some(Vec::new()));
    }
}
