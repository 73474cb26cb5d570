use std::fmt::{self, Display};

use crate::models::{
    DecisionFlags, GameRecommendation, GameRecord, PriceRecord, QualityAssessment, SearchStrategy,
};

/// Optional state fields a stage can require or consume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    SearchQuery,
    RawSearchResults,
    GameNames,
    GameDescriptions,
    GamePrices,
    Games,
    QualityAssessment,
}

impl Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateField::SearchQuery => "search_query",
            StateField::RawSearchResults => "raw_search_results",
            StateField::GameNames => "game_names",
            StateField::GameDescriptions => "game_descriptions",
            StateField::GamePrices => "game_prices",
            StateField::Games => "games",
            StateField::QualityAssessment => "quality_assessment",
        };
        write!(f, "{}", name)
    }
}

/// Everything one pipeline run knows, owned by the orchestrator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineState {
    pub user_request: String,
    pub search_query: Option<String>,
    pub search_strategy: SearchStrategy,
    pub raw_search_results: Option<Vec<String>>,
    pub game_names: Option<Vec<String>>,
    pub game_descriptions: Option<Vec<GameRecord>>,
    pub game_prices: Option<Vec<PriceRecord>>,
    pub games: Vec<GameRecord>,
    pub quality_assessment: Option<QualityAssessment>,
    pub decision_flags: DecisionFlags,
    pub retry_count: u32,
    pub alternative_search_queries: Vec<String>,
    pub game_recommendations: Option<Vec<GameRecommendation>>,
}

impl PipelineState {
    pub fn new(user_request: impl Into<String>) -> Self {
        Self {
            user_request: user_request.into(),
            ..Default::default()
        }
    }

    /// True when `field` currently holds a value
    pub fn has(&self, field: StateField) -> bool {
        match field {
            StateField::SearchQuery => self.search_query.is_some(),
            StateField::RawSearchResults => self.raw_search_results.is_some(),
            StateField::GameNames => self.game_names.is_some(),
            StateField::GameDescriptions => self.game_descriptions.is_some(),
            StateField::GamePrices => self.game_prices.is_some(),
            StateField::Games => true,
            StateField::QualityAssessment => self.quality_assessment.is_some(),
        }
    }

    pub fn clear(&mut self, field: StateField) {
        match field {
            StateField::SearchQuery => self.search_query = None,
            StateField::RawSearchResults => self.raw_search_results = None,
            StateField::GameNames => self.game_names = None,
            StateField::GameDescriptions => self.game_descriptions = None,
            StateField::GamePrices => self.game_prices = None,
            StateField::Games => self.games.clear(),
            StateField::QualityAssessment => self.quality_assessment = None,
        }
    }

    /// Overwrites every field the update sets; `user_request` is never touched
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(query) = update.search_query {
            self.search_query = Some(query);
        }
        if let Some(strategy) = update.search_strategy {
            self.search_strategy = strategy;
        }
        if let Some(results) = update.raw_search_results {
            self.raw_search_results = Some(results);
        }
        if let Some(names) = update.game_names {
            self.game_names = Some(names);
        }
        if let Some(descriptions) = update.game_descriptions {
            self.game_descriptions = Some(descriptions);
        }
        if let Some(prices) = update.game_prices {
            self.game_prices = Some(prices);
        }
        if let Some(games) = update.games {
            self.games = games;
        }
        if let Some(assessment) = update.quality_assessment {
            self.quality_assessment = Some(assessment);
        }
        if let Some(flags) = update.decision_flags {
            self.decision_flags = flags;
        }
        if let Some(retry_count) = update.retry_count {
            self.retry_count = retry_count;
        }
        if let Some(queries) = update.alternative_search_queries {
            self.alternative_search_queries = queries;
        }
        if let Some(recommendations) = update.game_recommendations {
            self.game_recommendations = Some(recommendations);
        }
    }
}

/// Partial state returned by a stage; `None` leaves a field as it was
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub search_query: Option<String>,
    pub search_strategy: Option<SearchStrategy>,
    pub raw_search_results: Option<Vec<String>>,
    pub game_names: Option<Vec<String>>,
    pub game_descriptions: Option<Vec<GameRecord>>,
    pub game_prices: Option<Vec<PriceRecord>>,
    pub games: Option<Vec<GameRecord>>,
    pub quality_assessment: Option<QualityAssessment>,
    pub decision_flags: Option<DecisionFlags>,
    pub retry_count: Option<u32>,
    pub alternative_search_queries: Option<Vec<String>>,
    pub game_recommendations: Option<Vec<GameRecommendation>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = PipelineState::new("cozy farming");

        assert_eq!(state.user_request, "cozy farming");
        assert_eq!(state.search_strategy, SearchStrategy::Standard);
        assert!(!state.has(StateField::SearchQuery));
        assert!(state.has(StateField::Games));
        assert_eq!(state.retry_count, 0);
    }

    #[test]
    fn test_apply_overwrites_only_set_fields() {
        let mut state = PipelineState::new("roguelikes");
        state.search_query = Some("roguelike games".to_string());
        state.game_names = Some(vec!["Hades".to_string()]);

        state.apply(StateUpdate {
            search_strategy: Some(SearchStrategy::Broad),
            retry_count: Some(1),
            ..Default::default()
        });

        assert_eq!(state.search_query.as_deref(), Some("roguelike games"));
        assert_eq!(state.search_strategy, SearchStrategy::Broad);
        assert_eq!(state.retry_count, 1);
        assert_eq!(state.game_names, Some(vec!["Hades".to_string()]));
    }

    #[test]
    fn test_clear() {
        let mut state = PipelineState::new("metroidvanias");
        state.raw_search_results = Some(vec!["Hollow Knight".to_string()]);
        state.games = vec![GameRecord::degraded("Hollow Knight")];

        state.clear(StateField::RawSearchResults);
        state.clear(StateField::Games);

        assert!(!state.has(StateField::RawSearchResults));
        assert!(state.games.is_empty());
    }
}
