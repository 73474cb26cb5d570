use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{GameRecommendation, GameRecord},
    pipeline::{
        stages::{Stage, StageName},
        state::{PipelineState, StateField, StateUpdate},
    },
    services::llm::{complete_json, FieldSpec, JsonShape, LlmTask, Prompt, StructuredModel},
};

const RECOMMENDATION_SHAPE: JsonShape = JsonShape {
    fields: &[
        FieldSpec::new("recommendations", "array of objects"),
        FieldSpec::new("recommendations[].gameId", "string, one of the ids listed above"),
        FieldSpec::new("recommendations[].reasoning", "string"),
    ],
};

/// Longest description excerpt shown to the model per game
const DESCRIPTION_EXCERPT_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
struct RecommendationPicks {
    recommendations: Vec<Pick>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pick {
    game_id: String,
    #[serde(default)]
    reasoning: String,
}

fn describe_game(game: &GameRecord) -> String {
    let mut line = format!("- id: {} | name: {}", game.id, game.name);
    if let Some(genre) = &game.genre {
        line.push_str(&format!(" | genre: {}", genre));
    }
    if let Some(playtime) = &game.playtime {
        line.push_str(&format!(" | playtime: {}", playtime));
    }
    if let Some(price) = game.current_price {
        line.push_str(&format!(" | price: ${:.2}", price));
        if let Some(discount) = game.discount.filter(|d| *d > 0) {
            line.push_str(&format!(" ({}% off)", discount));
        }
    }
    let excerpt: String = game.description.chars().take(DESCRIPTION_EXCERPT_CHARS).collect();
    line.push_str(&format!("\n  {}", excerpt));
    line
}

fn recommendation_prompt(user_request: &str, games: &[GameRecord], max: usize) -> Prompt {
    let catalog: Vec<String> = games.iter().map(describe_game).collect();
    let text = format!(
        "You are an expert video game recommendation agent.

User Request: {request}

Candidate games:
{catalog}

Pick up to {max} games from the candidates that best match the request.

Guidelines:
- Prefer a diverse set; avoid repeating the same franchise or genre unless the request asks for it
- Only reference games by the ids listed above
- For each pick write 2-3 sentences explaining why it fits the request
- Mention the price or discount when it makes the pick more persuasive",
        request = user_request,
        catalog = catalog.join("\n"),
        max = max,
    );
    Prompt::json(LlmTask::Recommend, text, &RECOMMENDATION_SHAPE)
}

/// Default justification used when the model cannot rank the games
fn templated_reasoning(game: &GameRecord) -> String {
    match &game.genre {
        Some(genre) => format!(
            "{} is a well-regarded {} game that matches what you are looking for.",
            game.name, genre
        ),
        None => format!(
            "{} is a well-regarded game that matches what you are looking for.",
            game.name
        ),
    }
}

fn fallback_recommendations(games: &[GameRecord], max: usize) -> Vec<GameRecommendation> {
    games
        .iter()
        .take(max)
        .map(|game| GameRecommendation {
            game: game.clone(),
            reasoning: templated_reasoning(game),
        })
        .collect()
}

/// Resolves the model's picks against the candidate games
///
/// Fails on an id that is not among the candidates; repeated ids are skipped.
fn resolve_picks(
    picks: Vec<Pick>,
    games: &[GameRecord],
    max: usize,
) -> AppResult<Vec<GameRecommendation>> {
    let by_id: HashMap<&str, &GameRecord> = games.iter().map(|g| (g.id.as_str(), g)).collect();
    let mut seen = HashSet::new();
    let mut recommendations = Vec::new();

    for pick in picks {
        let game = by_id
            .get(pick.game_id.as_str())
            .ok_or_else(|| AppError::UnknownGameId(pick.game_id.clone()))?;

        if !seen.insert(game.id.clone()) {
            tracing::debug!(game_id = %game.id, "Skipping repeated recommendation");
            continue;
        }
        if recommendations.len() < max {
            let reasoning = if pick.reasoning.trim().is_empty() {
                templated_reasoning(game)
            } else {
                pick.reasoning
            };
            recommendations.push(GameRecommendation {
                game: (*game).clone(),
                reasoning,
            });
        }
    }

    Ok(recommendations)
}

/// Chooses the final games and writes a justification for each
pub struct RecommendStage {
    llm: Arc<dyn StructuredModel>,
    max_recommendations: usize,
}

impl RecommendStage {
    pub fn new(llm: Arc<dyn StructuredModel>, max_recommendations: usize) -> Self {
        Self {
            llm,
            max_recommendations,
        }
    }
}

#[async_trait::async_trait]
impl Stage for RecommendStage {
    fn name(&self) -> StageName {
        StageName::Recommend
    }

    fn consumes(&self) -> &'static [StateField] {
        &[StateField::Games]
    }

    async fn run(&self, state: &PipelineState) -> AppResult<StateUpdate> {
        let games = &state.games;
        if games.is_empty() {
            tracing::info!("No games to recommend");
            return Ok(StateUpdate {
                game_recommendations: Some(Vec::new()),
                ..Default::default()
            });
        }

        let prompt = recommendation_prompt(&state.user_request, games, self.max_recommendations);
        let recommendations =
            match complete_json::<RecommendationPicks>(self.llm.as_ref(), &prompt).await {
                Ok(picks) if !picks.recommendations.is_empty() => {
                    resolve_picks(picks.recommendations, games, self.max_recommendations)?
                }
                Ok(_) => {
                    tracing::warn!("Model picked no games, using templated recommendations");
                    fallback_recommendations(games, self.max_recommendations)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Recommendation synthesis failed, using templated recommendations");
                    fallback_recommendations(games, self.max_recommendations)
                }
            };

        tracing::info!(
            candidates = games.len(),
            recommended = recommendations.len(),
            "Recommendations generated"
        );

        Ok(StateUpdate {
            game_recommendations: Some(recommendations),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::{LlmError, MockStructuredModel, ModelOutput};
    use serde_json::json;

    fn games(names: &[&str]) -> Vec<GameRecord> {
        names.iter().map(|n| GameRecord::degraded(n)).collect()
    }

    fn state_with(names: &[&str]) -> PipelineState {
        let mut state = PipelineState::new("story-rich adventures");
        state.games = games(names);
        state
    }

    #[tokio::test]
    async fn test_empty_games_skip_model() {
        let mut llm = MockStructuredModel::new();
        llm.expect_complete().never();

        let stage = RecommendStage::new(Arc::new(llm), 6);
        let update = stage.run(&state_with(&[])).await.unwrap();
        assert_eq!(update.game_recommendations, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_picks_resolved_in_model_order() {
        let mut llm = MockStructuredModel::new();
        llm.expect_complete()
            .withf(|prompt| prompt.task == LlmTask::Recommend && prompt.text.contains("id: firewatch"))
            .returning(|_| {
                Ok(ModelOutput::Json(json!({
                    "recommendations": [
                        {"gameId": "oxenfree", "reasoning": "Spooky radio mystery."},
                        {"gameId": "firewatch", "reasoning": "Quiet, character-driven."},
                        {"gameId": "firewatch", "reasoning": "Duplicate."}
                    ]
                })))
            });

        let stage = RecommendStage::new(Arc::new(llm), 6);
        let update = stage
            .run(&state_with(&["Firewatch", "Oxenfree", "Gone Home"]))
            .await
            .unwrap();

        let recommendations = update.game_recommendations.unwrap();
        assert_eq!(recommendations.len(), 2);
        assert_eq!(recommendations[0].game.id, "oxenfree");
        assert_eq!(recommendations[1].reasoning, "Quiet, character-driven.");
    }

    #[tokio::test]
    async fn test_unknown_id_is_error() {
        let mut llm = MockStructuredModel::new();
        llm.expect_complete().returning(|_| {
            Ok(ModelOutput::Json(json!({
                "recommendations": [{"gameId": "half-life-3", "reasoning": "Finally."}]
            })))
        });

        let stage = RecommendStage::new(Arc::new(llm), 6);
        let result = stage.run(&state_with(&["Firewatch"])).await;
        assert!(matches!(result, Err(AppError::UnknownGameId(id)) if id == "half-life-3"));
    }

    #[tokio::test]
    async fn test_failure_uses_first_n_games() {
        let mut llm = MockStructuredModel::new();
        llm.expect_complete()
            .returning(|_| Err(LlmError::Parse("truncated".to_string())));

        let names = ["A", "B", "C", "D", "E", "F", "G", "H"];
        let stage = RecommendStage::new(Arc::new(llm), 6);
        let recommendations = stage
            .run(&state_with(&names))
            .await
            .unwrap()
            .game_recommendations
            .unwrap();

        assert_eq!(recommendations.len(), 6);
        assert_eq!(recommendations[0].game.name, "A");
        assert!(recommendations[0].reasoning.contains("A is a well-regarded game"));
    }

    #[test]
    fn test_templated_reasoning_mentions_genre() {
        let mut game = GameRecord::degraded("Outer Wilds");
        game.genre = Some("Adventure".to_string());
        assert_eq!(
            templated_reasoning(&game),
            "Outer Wilds is a well-regarded Adventure game that matches what you are looking for."
        );
    }

    #[test]
    fn test_resolve_picks_caps_length() {
        let candidates = games(&["A", "B", "C"]);
        let picks = vec![
            Pick { game_id: "a".to_string(), reasoning: "1".to_string() },
            Pick { game_id: "b".to_string(), reasoning: "2".to_string() },
            Pick { game_id: "c".to_string(), reasoning: "3".to_string() },
        ];

        let resolved = resolve_picks(picks, &candidates, 2).unwrap();
        assert_eq!(resolved.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_reasoning_is_templated() {
        let mut llm = MockStructuredModel::new();
        llm.expect_complete().returning(|_| {
            Ok(ModelOutput::Json(json!({
                "recommendations": [
                    {"gameId": "firewatch", "reasoning": "   "},
                    {"gameId": "oxenfree"}
                ]
            })))
        });

        let stage = RecommendStage::new(Arc::new(llm), 6);
        let recommendations = stage
            .run(&state_with(&["Firewatch", "Oxenfree"]))
            .await
            .unwrap()
            .game_recommendations
            .unwrap();

        assert_eq!(
            recommendations[0].reasoning,
            "Firewatch is a well-regarded game that matches what you are looking for."
        );
        assert_eq!(
            recommendations[1].reasoning,
            "Oxenfree is a well-regarded game that matches what you are looking for."
        );
    }
}
