use serde::{Deserialize, Serialize};

/// Bias applied when generating and refining search queries
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    #[default]
    Standard,
    Broad,
    Specific,
}

impl SearchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::Standard => "standard",
            SearchStrategy::Broad => "broad",
            SearchStrategy::Specific => "specific",
        }
    }
}

/// Coarse verdict on how useful the current result set is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchQuality {
    Excellent,
    Good,
    Poor,
    Insufficient,
}

/// Evaluation of result adequacy for one pass of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualityAssessment {
    pub search_results_quality: SearchQuality,
    pub game_data_completeness: f64,
    pub recommendation_confidence: f64,
    pub needs_refinement: bool,
    pub issues: Vec<String>,
}

/// Routing hints derived from the latest assessment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DecisionFlags {
    pub should_retry_search: bool,
    pub should_expand_search: bool,
    pub should_use_alternative_strategy: bool,
    pub is_complex_query: bool,
    pub requires_specialized_search: bool,
}

impl DecisionFlags {
    /// True when any flag asks for another search pass
    pub fn wants_refinement(&self) -> bool {
        self.should_retry_search || self.should_expand_search || self.should_use_alternative_strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_serialization() {
        assert_eq!(
            serde_json::to_string(&SearchStrategy::Specific).unwrap(),
            "\"specific\""
        );
        let parsed: SearchStrategy = serde_json::from_str("\"broad\"").unwrap();
        assert_eq!(parsed, SearchStrategy::Broad);
    }

    #[test]
    fn test_wants_refinement() {
        let mut flags = DecisionFlags::default();
        assert!(!flags.wants_refinement());

        flags.is_complex_query = true;
        assert!(!flags.wants_refinement());

        flags.should_use_alternative_strategy = true;
        assert!(flags.wants_refinement());
    }
}
